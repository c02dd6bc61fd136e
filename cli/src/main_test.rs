#[cfg(test)]
mod tests {
    use crate::*;
    use drl_core::{Category, Range};

    #[test]
    fn test_sanitize_path_allows_simple_relative() {
        let p = sanitize_path("rules/orders.drl").expect("relative path should be allowed");
        assert_eq!(p, PathBuf::from("rules/orders.drl"));
    }

    #[test]
    fn test_sanitize_path_rejects_parent_dir() {
        let err = sanitize_path("rules/../orders.drl").unwrap_err();
        assert!(err.to_string().contains("Parent directory components"));
    }

    #[test]
    fn test_check_requires_a_file() {
        assert!(CliArgs::try_parse_from(["drl", "check"]).is_err());
    }

    #[test]
    fn test_check_args() {
        let args = CliArgs::try_parse_from(["drl", "check", "a.drl", "b.drl", "--json", "--errors-only"])
            .expect("should parse");
        match args.command {
            Commands::Check {
                files,
                json,
                errors_only,
                config,
            } => {
                assert_eq!(files, vec![PathBuf::from("a.drl"), PathBuf::from("b.drl")]);
                assert!(json && errors_only);
                assert!(config.is_none());
            }
            other => panic!("expected check command, got {other:?}"),
        }
    }

    #[test]
    fn test_tree_rejects_parent_dir() {
        assert!(CliArgs::try_parse_from(["drl", "tree", "../x.drl"]).is_err());
    }

    #[test]
    fn test_format_diagnostic_is_one_based() {
        let d = Diagnostic::error(
            Range::on_line(4, 2, 3),
            Category::UndefinedVariable,
            "Variable '$x' is not bound",
        );
        assert_eq!(
            format_diagnostic(Path::new("a.drl"), &d),
            "a.drl:5:3: error [undefined-variable] Variable '$x' is not bound"
        );
    }

    #[test]
    fn test_load_settings_without_config_is_default() {
        assert_eq!(load_settings(None).expect("defaults"), Settings::default());
    }
}
