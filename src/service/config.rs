use super::{ConnectOptions, Engine};

pub fn parse_engine(s: &str) -> Option<Engine> {
    match s.to_lowercase().as_str() {
        "solr" => Some(Engine::Solr),
        #[cfg(any(test, feature = "service-mock"))]
        "mock" => Some(Engine::Mock),
        _ => None,
    }
}

/// Builds connect options from the endpoint plus extra `key=value` pairs.
/// Pairs without `=` are ignored.
pub fn parse_connect_kv(endpoint: &str, pairs: &[String]) -> ConnectOptions {
    let mut opts = ConnectOptions::with_endpoint(endpoint);
    for p in pairs {
        if let Some((k, v)) = p.split_once('=') {
            opts.params.insert(k.to_string(), v.to_string());
        }
    }
    opts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engines_parse_case_insensitively() {
        assert_eq!(parse_engine("SOLR"), Some(Engine::Solr));
        assert_eq!(parse_engine("mock"), Some(Engine::Mock));
        assert_eq!(parse_engine("zenoh"), None);
    }

    #[test]
    fn kv_pairs_extend_endpoint() {
        let opts = parse_connect_kv(
            "http://localhost:8983/solr/fp",
            &["timeout_ms=500".to_string(), "junk".to_string()],
        );
        assert_eq!(opts.params.get("endpoint").map(String::as_str), Some("http://localhost:8983/solr/fp"));
        assert_eq!(opts.params.get("timeout_ms").map(String::as_str), Some("500"));
        assert_eq!(opts.params.len(), 2);
    }
}
