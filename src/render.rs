//! Clash document rendering
//! The document is modelled as serde structs and emitted with serde_yaml, so
//! labels are always quoted as the YAML emitter requires

use crate::entry::ProxyEntry;
use serde::{Deserialize, Serialize};

/// Load-balancing group name
pub const GROUP_LOAD_BALANCE: &str = "负载均衡";
/// Latency-probing group name
pub const GROUP_AUTO: &str = "自动选择";
/// Manual selection group name, also the catch-all rule target
pub const GROUP_SELECT: &str = "🌍选择代理";

const PROBE_URL: &str = "http://www.gstatic.com/generate_204";
const PROBE_INTERVAL: u32 = 300;
const PROBE_TOLERANCE: u32 = 50;
const WS_PATH: &str = "/?ed=2560";
const CLIENT_FINGERPRINT: &str = "chrome";

const BOOTSTRAP_NAMESERVERS: [&str; 3] = ["223.5.5.5", "114.114.114.114", "8.8.8.8"];
const NAMESERVERS: [&str; 2] = ["https://dns.alidns.com/dns-query", "https://doh.pub/dns-query"];
const FALLBACK_NAMESERVERS: [&str; 2] = ["https://1.0.0.1/dns-query", "tls://dns.google"];

/// Output flavour of a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RenderStyle {
    /// Bootstrap resolvers under `default-nameserver`
    #[default]
    Singular,
    /// Bootstrap resolvers under `default-nameservers`
    Plural,
}

/// Fixed per-deployment values written into every document
#[derive(Debug, Clone)]
pub struct RenderParams {
    /// SNI and websocket `Host` header
    pub hostname: String,
    /// Trojan password shared by every proxy
    pub password: String,
    /// Client mixed port
    pub listen_port: u16,
    pub style: RenderStyle,
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct Document<'a> {
    port: u16,
    allow_lan: bool,
    mode: &'static str,
    log_level: &'static str,
    unified_delay: bool,
    global_client_fingerprint: &'static str,
    dns: Dns,
    proxies: Vec<Proxy<'a>>,
    proxy_groups: Vec<ProxyGroup<'a>>,
    rules: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct Dns {
    enable: bool,
    listen: &'static str,
    ipv6: bool,
    enhanced_mode: &'static str,
    fake_ip_range: &'static str,
    // Exactly one of the two is set, depending on the style
    #[serde(skip_serializing_if = "Option::is_none")]
    default_nameserver: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_nameservers: Option<Vec<&'static str>>,
    nameserver: Vec<&'static str>,
    fallback: Vec<&'static str>,
    fallback_filter: FallbackFilter,
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct FallbackFilter {
    geoip: bool,
    geoip_code: &'static str,
    ipcidr: Vec<&'static str>,
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct Proxy<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    server: &'a str,
    port: Port<'a>,
    password: &'a str,
    udp: bool,
    sni: &'a str,
    network: &'static str,
    ws_opts: WsOpts<'a>,
}

/// Numeric when the address carries a valid port, the raw text otherwise
#[derive(Serialize)]
#[serde(untagged)]
enum Port<'a> {
    Number(u16),
    Raw(&'a str),
}

impl<'a> Port<'a> {
    fn parse(raw: &'a str) -> Self {
        raw.parse().map(Port::Number).unwrap_or(Port::Raw(raw))
    }
}

#[derive(Serialize)]
struct WsOpts<'a> {
    path: &'static str,
    headers: WsHeaders<'a>,
}

#[derive(Serialize)]
struct WsHeaders<'a> {
    #[serde(rename = "Host")]
    host: &'a str,
}

#[derive(Serialize)]
struct ProxyGroup<'a> {
    name: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    interval: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tolerance: Option<u32>,
    proxies: Vec<&'a str>,
}

/// Render the complete document for `entries`
pub fn render_document(entries: &[ProxyEntry], params: &RenderParams) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(&build_document(entries, params))
}

fn build_document<'a>(entries: &'a [ProxyEntry], params: &'a RenderParams) -> Document<'a> {
    Document {
        port: params.listen_port,
        allow_lan: true,
        mode: "rule",
        log_level: "info",
        unified_delay: true,
        global_client_fingerprint: CLIENT_FINGERPRINT,
        dns: build_dns(params.style),
        proxies: entries.iter().map(|entry| build_proxy(entry, params)).collect(),
        proxy_groups: build_groups(entries),
        rules: vec![
            "GEOIP,LAN,DIRECT".to_string(),
            "GEOIP,CN,DIRECT".to_string(),
            format!("MATCH,{}", GROUP_SELECT),
        ],
    }
}

fn build_dns(style: RenderStyle) -> Dns {
    let bootstrap = BOOTSTRAP_NAMESERVERS.to_vec();
    let (default_nameserver, default_nameservers) = match style {
        RenderStyle::Singular => (Some(bootstrap), None),
        RenderStyle::Plural => (None, Some(bootstrap)),
    };

    Dns {
        enable: true,
        listen: ":53",
        ipv6: true,
        enhanced_mode: "fake-ip",
        fake_ip_range: "198.18.0.1/16",
        default_nameserver,
        default_nameservers,
        nameserver: NAMESERVERS.to_vec(),
        fallback: FALLBACK_NAMESERVERS.to_vec(),
        fallback_filter: FallbackFilter {
            geoip: true,
            geoip_code: "CN",
            ipcidr: vec!["240.0.0.0/4"],
        },
    }
}

fn build_proxy<'a>(entry: &'a ProxyEntry, params: &'a RenderParams) -> Proxy<'a> {
    Proxy {
        name: &entry.label,
        kind: "trojan",
        server: entry.host(),
        port: Port::parse(entry.port()),
        password: &params.password,
        udp: false,
        sni: &params.hostname,
        network: "ws",
        ws_opts: WsOpts {
            path: WS_PATH,
            headers: WsHeaders {
                host: &params.hostname,
            },
        },
    }
}

fn build_groups(entries: &[ProxyEntry]) -> Vec<ProxyGroup<'_>> {
    let labels: Vec<&str> = entries.iter().map(|e| e.label.as_str()).collect();

    let mut select_members = vec![GROUP_LOAD_BALANCE, GROUP_AUTO, "DIRECT"];
    select_members.extend(labels.iter().copied());

    vec![
        ProxyGroup {
            name: GROUP_LOAD_BALANCE,
            kind: "load-balance",
            url: Some(PROBE_URL),
            interval: Some(PROBE_INTERVAL),
            tolerance: None,
            proxies: labels.clone(),
        },
        ProxyGroup {
            name: GROUP_AUTO,
            kind: "url-test",
            url: Some(PROBE_URL),
            interval: Some(PROBE_INTERVAL),
            tolerance: Some(PROBE_TOLERANCE),
            proxies: labels,
        },
        ProxyGroup {
            name: GROUP_SELECT,
            kind: "select",
            url: None,
            interval: None,
            tolerance: None,
            proxies: select_members,
        },
    ]
}
