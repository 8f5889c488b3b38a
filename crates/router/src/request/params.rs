use crate::extract::ExtractError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;

/// Parameters captured from the request path, in the order they appear in the pattern.
///
/// For the pattern `/users/:id/files/*path` and the request path `/users/7/files/a/b`,
/// the parameters are `id = "7"` followed by `path = "a/b"`. Values are percent-decoded
/// unless [`RouterConfig::decode_path`](crate::router::RouterConfig::decode_path) is off.
/// Names are case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    inner: Vec<(Arc<str>, String)>,
}

impl PathParams {
    /// Creates an empty PathParams instance with no parameters
    #[inline]
    pub fn empty() -> Self {
        Self { inner: Vec::new() }
    }

    pub(crate) fn from_captures(captures: Vec<(Arc<str>, String)>) -> Self {
        Self { inner: captures }
    }

    /// Returns true if there are no path parameters
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of path parameters
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Gets the value of a path parameter by its name
    /// Returns None if the parameter doesn't exist
    pub fn get(&self, name: impl AsRef<str>) -> Option<&str> {
        let name = name.as_ref();
        self.inner.iter().find(|(key, _)| key.as_ref() == name).map(|(_, value)| value.as_str())
    }

    /// Iterates over `(name, value)` pairs in pattern order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(key, value)| (key.as_ref(), value.as_str()))
    }

    /// Parses one parameter with [`FromStr`].
    pub fn parse<T>(&self, name: &str) -> Result<T, ExtractError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let value = self.get(name).ok_or_else(|| ExtractError::missing(name))?;
        value.parse::<T>().map_err(|e| ExtractError::invalid_path(format!("parameter '{name}': {e}")))
    }

    /// Binds the parameters into a structured type.
    ///
    /// A struct binds parameters by name. When only one parameter was captured it may also
    /// be bound as a bare value, e.g. `String` or `u64`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ExtractError> {
        let pairs = self.iter().collect::<Vec<_>>();
        let encoded = serde_urlencoded::to_string(&pairs).map_err(ExtractError::invalid_path)?;
        let by_name = serde_urlencoded::from_str::<T>(&encoded);

        match (by_name, self.inner.as_slice()) {
            (Ok(value), _) => Ok(value),
            (Err(e), [(_, value)]) => {
                let encoded = serde_urlencoded::to_string(&[("value", value.as_str())][..]).map_err(ExtractError::invalid_path)?;
                match serde_urlencoded::from_str::<Single<T>>(&encoded) {
                    Ok(single) => Ok(single.value),
                    Err(_) => Err(ExtractError::invalid_path(e)),
                }
            }
            (Err(e), _) => Err(ExtractError::invalid_path(e)),
        }
    }
}

#[derive(Deserialize)]
struct Single<T> {
    value: T,
}

impl<'a> IntoIterator for &'a PathParams {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use crate::PathParams;
    use serde::Deserialize;
    use std::sync::Arc;

    fn params(pairs: &[(&str, &str)]) -> PathParams {
        PathParams::from_captures(pairs.iter().map(|(k, v)| (Arc::from(*k), (*v).to_string())).collect())
    }

    #[test]
    fn test_get_keeps_order() {
        let params = params(&[("user", "7"), ("path", "a/b")]);

        assert_eq!(params.len(), 2);
        assert_eq!(params.get("user"), Some("7"));
        assert_eq!(params.get("path"), Some("a/b"));
        assert_eq!(params.get("User"), None);
        assert_eq!(params.iter().collect::<Vec<_>>(), vec![("user", "7"), ("path", "a/b")]);
    }

    #[test]
    fn test_parse() {
        let params = params(&[("id", "42"), ("name", "john")]);

        assert_eq!(params.parse::<u32>("id").unwrap(), 42);
        assert!(params.parse::<u32>("name").is_err());
        assert!(params.parse::<u32>("missing").is_err());
    }

    #[test]
    fn test_deserialize_struct() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct BookPath {
            shelf: String,
            isdn: u64,
        }

        let params = params(&[("shelf", "fiction"), ("isdn", "123")]);
        let book = params.deserialize::<BookPath>().unwrap();

        assert_eq!(book, BookPath { shelf: "fiction".into(), isdn: 123 });
    }

    #[test]
    fn test_deserialize_keeps_reserved_characters() {
        #[derive(Deserialize)]
        struct FilePath {
            filepath: String,
        }

        let params = params(&[("filepath", "a/b c&d=e")]);
        let file = params.deserialize::<FilePath>().unwrap();

        assert_eq!(file.filepath, "a/b c&d=e");
    }

    #[test]
    fn test_deserialize_single_value() {
        let params = params(&[("isdn", "123")]);

        assert_eq!(params.deserialize::<u64>().unwrap(), 123);
        assert_eq!(params.deserialize::<String>().unwrap(), "123");
        assert!(params.deserialize::<bool>().is_err());
    }
}
