use serde::Deserialize;

/// Switches for the behaviour of the router when a path has no exact match.
///
/// Every switch is on by default. The struct deserializes from any serde format, missing
/// fields keep their default:
///
/// ```
/// # use micro_router::router::RouterConfig;
/// let config: RouterConfig = serde_json::from_str(r#"{ "redirect_fixed_path": false }"#).unwrap();
/// assert!(!config.redirect_fixed_path);
/// assert!(config.redirect_trailing_slash);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools, reason = "independent switches")]
pub struct RouterConfig {
    /// Redirect `/books/` to `/books` (and the other way around) when only the other form is
    /// registered.
    pub redirect_trailing_slash: bool,
    /// Redirect to the cleaned path, with `//`, `.` and `..` resolved, when it matches a route.
    pub redirect_fixed_path: bool,
    /// Lets fixed path lookup match static segments regardless of case.
    pub case_insensitive: bool,
    /// Answer `405 Method Not Allowed` instead of `404` when another method matches the path.
    pub handle_method_not_allowed: bool,
    /// Answer OPTIONS requests with the global OPTIONS handler.
    pub handle_options: bool,
    /// Percent-decode the request path before matching, so `/hello/John%20Doe` captures
    /// `John Doe`. An encoded `/` (`%2F`) then separates segments like a plain one.
    pub decode_path: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            redirect_trailing_slash: true,
            redirect_fixed_path: true,
            case_insensitive: true,
            handle_method_not_allowed: true,
            handle_options: true,
            decode_path: true,
        }
    }
}
