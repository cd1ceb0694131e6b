use crate::sync::config::SyncConfig;

/// Extract the application name from a managed identity display name.
///
/// Names follow the `id-service-<app>-<env>-<region>-<seq>` convention, so
/// the app name is always the third segment. Anything with fewer than four
/// segments is malformed and yields an empty string.
pub fn extract_app_name(identity_name: &str) -> &str {
    let parts: Vec<&str> = identity_name.split('-').collect();
    if parts.len() < 4 {
        return "";
    }
    parts[2]
}

/// Deterministic name of the ServiceAccount bound to an application's
/// identity. This is the single source of truth for binding names.
pub fn service_account_name(config: &SyncConfig, app_name: &str) -> String {
    format!("{}{app_name}", config.service_account_prefix)
}

/// Label selector matching every RoleAssignment owned by an application
pub fn grant_selector(app_name: &str) -> String {
    format!("application={app_name},type=roleassignment")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_third_segment() {
        assert_eq!(extract_app_name("id-service-appname-dv-azunea-001"), "appname");
        assert_eq!(extract_app_name("id-service-app1-dv-azunea-001"), "app1");
    }

    #[test]
    fn short_names_are_rejected() {
        assert_eq!(extract_app_name("too-short"), "");
        assert_eq!(extract_app_name("a-b-c"), "");
        assert_eq!(extract_app_name(""), "");
    }

    #[test]
    fn exactly_four_segments_is_accepted() {
        assert_eq!(extract_app_name("id-service-app-dv"), "app");
    }

    #[test]
    fn service_account_name_uses_configured_prefix() {
        let config = SyncConfig::default();
        assert_eq!(service_account_name(&config, "app1"), "workload-identity-app1");
    }

    #[test]
    fn grant_selector_matches_both_labels() {
        assert_eq!(grant_selector("app1"), "application=app1,type=roleassignment");
    }
}
