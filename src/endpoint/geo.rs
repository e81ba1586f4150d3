//! IP geolocation via ip-api.com

use crate::models::{Endpoint, IpInfo};
use futures::future::join_all;
use reqwest::Client;
use std::time::Duration;

pub const LOOKUP_FAILED: &str = "lookup failed";
pub const UNKNOWN_LOCATION: &str = "unknown location";

const DESCRIBE_FIELDS: &str = "status,city,regionName,country,as,org";
const SELF_FIELDS: &str = "query,as,isp,city,regionName,country";
const TARGET_FIELDS: &str = "query,as,isp,org,city,regionName,country";

/// Human-readable `City, Region, Country (AS)` for a lookup record
pub fn describe_info(info: &IpInfo) -> String {
    let location = info.location();
    let mut desc = if location.is_empty() {
        UNKNOWN_LOCATION.to_string()
    } else {
        location
    };

    let network = info.network();
    if !network.is_empty() {
        desc.push_str(&format!(" ({})", network));
    }
    desc
}

/// Client for an ip-api compatible JSON endpoint
#[derive(Clone)]
pub struct GeoLocator {
    client: Client,
    base_url: String,
    timeout: Duration,
    info_timeout: Duration,
}

impl GeoLocator {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, crate::defaults::GEO_API_BASE)
    }

    /// Use another server, e.g. a local mock
    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: crate::defaults::GEO_TIMEOUT,
            info_timeout: crate::defaults::SELF_INFO_TIMEOUT,
        }
    }

    /// Description for one address; any failure yields `lookup failed`
    pub async fn describe(&self, ip: &str) -> String {
        let url = format!("{}/{}", self.base_url, ip);
        match self.fetch(&url, DESCRIBE_FIELDS, self.timeout).await {
            Some(info) if info.status == "success" => describe_info(&info),
            _ => LOOKUP_FAILED.to_string(),
        }
    }

    /// Annotate every address concurrently, keeping input order
    pub async fn describe_all(&self, ips: &[String]) -> Vec<Endpoint> {
        let descs = join_all(ips.iter().map(|ip| self.describe(ip))).await;
        ips.iter()
            .zip(descs)
            .map(|(ip, desc)| Endpoint::new(ip.clone(), desc))
            .collect()
    }

    /// Lookup record for `target`, or for the caller's own address when empty.
    ///
    /// Failures produce an empty record.
    pub async fn fetch_info(&self, target: &str) -> IpInfo {
        let (url, fields) = if target.is_empty() {
            (format!("{}/", self.base_url), SELF_FIELDS)
        } else {
            (format!("{}/{}", self.base_url, target), TARGET_FIELDS)
        };
        self.fetch(&url, fields, self.info_timeout).await.unwrap_or_default()
    }

    async fn fetch(&self, url: &str, fields: &str, timeout: Duration) -> Option<IpInfo> {
        let request = async {
            let response = self.client.get(url).query(&[("fields", fields)]).send().await.ok()?;
            response.json::<IpInfo>().await.ok()
        };
        tokio::time::timeout(timeout, request).await.ok().flatten()
    }
}
