//! 站点域名策略
//!
//! 由宿主在启动时检查一次，决定是否在当前页面运行标注管道。

use serde::{Deserialize, Serialize};
use url::Url;

/// 允许/拒绝域名列表
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct DomainPolicy {
    /// 非空时只在这些域名（含子域名）上运行
    pub allow: Vec<String>,
    /// 这些域名（含子域名）永不运行，优先于 allow
    pub deny: Vec<String>,
}

impl DomainPolicy {
    /// 判断页面地址是否允许运行；无法解析出主机名的地址只受 allow 列表约束
    pub fn permits(&self, page_url: &str) -> bool {
        let host = Url::parse(page_url)
            .ok()
            .and_then(|url| url.host_str().map(|h| h.to_lowercase()));

        let Some(host) = host else {
            return self.allow.is_empty();
        };

        if self.deny.iter().any(|domain| host_matches(&host, domain)) {
            return false;
        }

        self.allow.is_empty() || self.allow.iter().any(|domain| host_matches(&host, domain))
    }
}

fn host_matches(host: &str, domain: &str) -> bool {
    let domain = domain.trim().trim_start_matches("*.").to_lowercase();
    !domain.is_empty() && (host == domain || host.ends_with(&format!(".{}", domain)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_policy_permits_everything() {
        assert!(DomainPolicy::default().permits("https://news.example.com/a"));
        assert!(DomainPolicy::default().permits("file:///tmp/page.html"));
    }

    #[test]
    fn test_deny_wins_over_allow_and_covers_subdomains() {
        let policy = DomainPolicy {
            allow: vec!["example.com".to_string()],
            deny: vec!["mail.example.com".to_string()],
        };
        assert!(policy.permits("https://www.example.com/"));
        assert!(!policy.permits("https://mail.example.com/inbox"));
        assert!(!policy.permits("https://other.org/"));
        assert!(!policy.permits("https://notexample.com/"));
    }
}
