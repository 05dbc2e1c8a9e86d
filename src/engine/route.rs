//! 路由解析
//! 根据当前路由从词典中选出生效的规则，并区分选择器规则与文本规则

use std::sync::Arc;
use tracing::debug;
use url::Url;

use super::cache::MatchCache;
use super::state::ActiveContent;
use crate::compiler::{DictionaryStore, Rule};
use crate::error::LocResult;

/// 去除路由中的查询串
pub fn strip_query(route: &str) -> &str {
    route.split_once('?').map_or(route, |(path, _)| path)
}

/// 从完整 URL 或 hash 字符串得到路由（`#` + fragment）
pub fn route_from_url(input: &str) -> LocResult<String> {
    if input.is_empty() || input.starts_with('#') {
        return Ok(input.to_string());
    }
    let url = Url::parse(input)?;
    Ok(url.fragment().map(|fragment| format!("#{}", fragment)).unwrap_or_default())
}

/// 路由模式匹配
///
/// 空模式只匹配空路由；非空模式要求路由以模式开头，且在路径分段边界上结束。
pub fn pattern_matches(pattern: &str, route: &str) -> bool {
    if pattern.is_empty() {
        return route.is_empty();
    }
    match route.strip_prefix(pattern) {
        Some(rest) => rest.is_empty() || pattern.ends_with('/') || rest.starts_with('/'),
        None => false,
    }
}

/// 路由解析器
pub struct RouteResolver;

impl RouteResolver {
    /// 按声明顺序收集所有匹配规则集中的规则，返回（文本规则，选择器规则）
    pub fn select(route: &str, store: &DictionaryStore) -> ActiveContent {
        let route = strip_query(route);
        let mut active = ActiveContent {
            route_key: Some(route.to_string()),
            ..ActiveContent::default()
        };

        let mut matched_sets = 0;
        for rule_set in &store.rule_sets {
            if !rule_set.route_patterns.iter().any(|pattern| pattern_matches(pattern, route)) {
                continue;
            }
            matched_sets += 1;
            for rule in &rule_set.rules {
                match rule {
                    Rule::Unscoped(rule) => active.unscoped.push(Arc::clone(rule)),
                    Rule::Scoped(rule) => active.scoped.push(Arc::clone(rule)),
                }
            }
        }

        debug!(
            "路由 {:?} 匹配规则集 {} 个：文本规则 {} 条，选择器规则 {} 条",
            route,
            matched_sets,
            active.unscoped.len(),
            active.scoped.len()
        );
        active
    }

    /// 路由变化时重建当前规则并清空缓存，返回是否发生了重建
    pub fn resolve(
        route: &str,
        store: &DictionaryStore,
        active: &mut ActiveContent,
        cache: &mut MatchCache,
    ) -> bool {
        let route = strip_query(route);
        if active.route_key.as_deref() == Some(route) {
            return false;
        }
        *active = Self::select(route, store);
        cache.clear();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{RuleSet, UnscopedRule};

    fn store() -> DictionaryStore {
        DictionaryStore::new(vec![
            RuleSet::new(["#!/room"]).with_rule(UnscopedRule::exact("Room", "房间")),
            RuleSet::new([""]).with_rule(UnscopedRule::exact("Home", "首页")),
            RuleSet::new(["#!/overview", "#!/room/"]).with_rule(UnscopedRule::exact("Overview", "总览")),
        ])
    }

    #[test]
    fn test_strip_query() {
        assert_eq!(strip_query("#!/room/E1N1?tab=2"), "#!/room/E1N1");
        assert_eq!(strip_query("#!/room"), "#!/room");
        assert_eq!(strip_query("?a=1"), "");
    }

    #[test]
    fn test_pattern_matches_on_segment_boundary() {
        assert!(pattern_matches("#!/room", "#!/room"));
        assert!(pattern_matches("#!/room", "#!/room/E1N1"));
        assert!(!pattern_matches("#!/room", "#!/roomx"));
        assert!(pattern_matches("#!/room/", "#!/room/E1N1"));
        assert!(!pattern_matches("#!/room/", "#!/room"));
        assert!(pattern_matches("", ""));
        assert!(!pattern_matches("", "#!/room"));
        assert!(!pattern_matches("#!/room", ""));
    }

    #[test]
    fn test_route_from_url() {
        assert_eq!(route_from_url("https://screeps.com/a/#!/room/shard3/E1N1").unwrap(), "#!/room/shard3/E1N1");
        assert_eq!(route_from_url("https://screeps.com/a/").unwrap(), "");
        assert_eq!(route_from_url("#!/overview").unwrap(), "#!/overview");
        assert!(route_from_url("not a url").is_err());
    }

    #[test]
    fn test_select_concatenates_in_declared_order() {
        let active = RouteResolver::select("#!/room/E1N1?x=1", &store());
        assert_eq!(active.route_key.as_deref(), Some("#!/room/E1N1"));
        let sources: Vec<_> = active.unscoped.iter().map(|rule| rule.source.describe()).collect();
        assert_eq!(sources, vec!["Room", "Overview"]);

        let empty = RouteResolver::select("", &store());
        assert_eq!(empty.unscoped.len(), 1);

        let none = RouteResolver::select("#!/market", &store());
        assert!(none.is_empty());
    }

    #[test]
    fn test_resolve_rebuilds_only_on_change() {
        let store = store();
        let mut active = ActiveContent::default();
        let mut cache = MatchCache::new();

        assert!(RouteResolver::resolve("#!/room", &store, &mut active, &mut cache));
        cache.insert("div.title", 0, "x".to_string());
        active.unscoped.clear();

        // 查询串不同视为同一路由
        assert!(!RouteResolver::resolve("#!/room?y=2", &store, &mut active, &mut cache));
        assert!(active.unscoped.is_empty());
        assert_eq!(cache.len(), 1);

        assert!(RouteResolver::resolve("#!/overview", &store, &mut active, &mut cache));
        assert!(cache.is_empty());
        assert_eq!(active.unscoped.len(), 1);
    }
}
