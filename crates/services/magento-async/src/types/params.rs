use bytes::Bytes;

/// Key of the parameter that selects the base URL instead of being sent
pub const BASE_PARAM: &str = "base";
/// Key whose presence switches a POST body to multipart form data
pub const MEDIA_PARAM: &str = "media";

/// A binary upload field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Raw file contents
    pub bytes: Bytes,
    /// File name reported in the multipart header
    pub file_name: Option<String>,
    /// MIME type reported in the multipart header
    pub mime: Option<String>,
}

impl FilePart {
    /// Creates a file part from raw bytes
    #[must_use]
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            file_name: None,
            mime: None,
        }
    }

    /// Sets the file name
    #[must_use]
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Sets the MIME type
    #[must_use]
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

/// A single request parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// Plain text value
    Text(String),
    /// Binary upload, only sent in multipart bodies
    File(FilePart),
}

impl ParamValue {
    /// Returns the text value, or `None` for file parts
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::File(_) => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&String> for ParamValue {
    fn from(v: &String) -> Self {
        Self::Text(v.clone())
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<u64> for ParamValue {
    fn from(v: u64) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<FilePart> for ParamValue {
    fn from(v: FilePart) -> Self {
        Self::File(v)
    }
}

/// Ordered request parameters
///
/// Keys are unique; inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, ParamValue)>,
}

impl Params {
    /// Creates an empty parameter set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, builder style
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a parameter, returning the value it replaced
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<ParamValue>,
    ) -> Option<ParamValue> {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            return Some(std::mem::replace(&mut slot.1, value));
        }
        self.entries.push((key, value));
        None
    }

    /// Looks up a parameter
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Removes a parameter and returns its value
    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    /// Returns true if the key is present
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of parameters
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no parameters
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates parameters in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Takes the `base` selector out of the set
    ///
    /// File values cannot name a base and are dropped.
    pub(crate) fn take_base(&mut self) -> Option<String> {
        match self.remove(BASE_PARAM)? {
            ParamValue::Text(s) => Some(s),
            ParamValue::File(_) => None,
        }
    }

    /// Splits the set into text pairs and the keys of file parts
    pub(crate) fn text_pairs(&self) -> (Vec<(String, String)>, Vec<String>) {
        let mut pairs = Vec::with_capacity(self.entries.len());
        let mut files = Vec::new();
        for (k, v) in &self.entries {
            match v {
                ParamValue::Text(s) => pairs.push((k.clone(), s.clone())),
                ParamValue::File(_) => files.push(k.clone()),
            }
        }
        (pairs, files)
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

impl IntoIterator for Params {
    type Item = (String, ParamValue);
    type IntoIter = std::vec::IntoIter<(String, ParamValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
