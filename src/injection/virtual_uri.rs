//! Addresses of virtual documents.
//!
//! A virtual document lives next to its host: `file:///src/main.rs` hosting
//! a SQL fragment yields `file:///src/utsushi-virtual-uri-<ulid>.sql`. Hosts
//! that cannot be a base (`untitled:`, `data:`) fall back to
//! `utsushi:///virtual/<percent-encoded host>/utsushi-virtual-uri-<ulid>.<ext>`.

use ulid::Ulid;
use url::Url;

/// Prefix of every virtual document file name.
const VIRTUAL_URI_PREFIX: &str = "utsushi-virtual-uri-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualDocumentUri {
    host_url: Url,
    language: String,
    id: Ulid,
}

impl VirtualDocumentUri {
    pub fn new(host_url: &Url, language: &str, id: Ulid) -> Self {
        debug_assert!(!language.is_empty(), "language must not be empty");
        Self {
            host_url: host_url.clone(),
            language: language.to_string(),
            id,
        }
    }

    pub fn id(&self) -> Ulid {
        self.id
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    fn file_name(&self) -> String {
        format!(
            "{VIRTUAL_URI_PREFIX}{}.{}",
            self.id,
            language_to_extension(&self.language)
        )
    }

    pub fn to_url(&self) -> Url {
        let file_name = self.file_name();

        let mut url = self.host_url.clone();
        // path_segments_mut() fails for cannot-be-a-base URLs
        let modified = url
            .path_segments_mut()
            .map(|mut segments| {
                segments.pop();
                segments.push(&file_name);
            })
            .is_ok();
        if modified {
            return url;
        }

        let encoded_host = percent_encoding::utf8_percent_encode(
            self.host_url.as_str(),
            percent_encoding::NON_ALPHANUMERIC,
        );
        let fallback = format!("utsushi:///virtual/{encoded_host}/{file_name}");
        match Url::parse(&fallback) {
            Ok(url) => url,
            Err(err) => {
                log::warn!(
                    target: "utsushi::cache",
                    "Fallback virtual URI {} is invalid: {}",
                    fallback,
                    err
                );
                url
            }
        }
    }

    /// Document id encoded in a virtual document URL.
    pub fn parse_id(url: &Url) -> Option<Ulid> {
        let file_name = url.path_segments()?.next_back()?;
        let (id, extension) = file_name.strip_prefix(VIRTUAL_URI_PREFIX)?.rsplit_once('.')?;
        if extension.is_empty() {
            return None;
        }
        Ulid::from_string(id).ok()
    }

    pub fn is_virtual(url: &Url) -> bool {
        Self::parse_id(url).is_some()
    }
}

/// File extension for an injected language; "txt" when unknown.
fn language_to_extension(language: &str) -> &'static str {
    match language {
        "lua" => "lua",
        "python" => "py",
        "rust" => "rs",
        "javascript" => "js",
        "typescript" => "ts",
        "go" => "go",
        "c" => "c",
        "cpp" => "cpp",
        "java" => "java",
        "ruby" => "rb",
        "sql" => "sql",
        "regex" => "regex",
        "html" => "html",
        "css" => "css",
        "json" => "json",
        "yaml" => "yaml",
        "toml" => "toml",
        "xml" => "xml",
        "markdown" => "md",
        "bash" | "sh" => "sh",
        _ => "txt",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "01ARZ3NDEKTSV4RRFFQ69G5FAV";

    fn id() -> Ulid {
        Ulid::from_string(ID).unwrap()
    }

    #[test]
    fn test_virtual_url_lives_next_to_host() {
        let host = Url::parse("file:///project/src/main.rs").unwrap();
        let url = VirtualDocumentUri::new(&host, "sql", id()).to_url();
        assert_eq!(
            url.as_str(),
            format!("file:///project/src/utsushi-virtual-uri-{ID}.sql")
        );
    }

    #[test]
    fn test_unknown_language_uses_txt() {
        let host = Url::parse("file:///main.rs").unwrap();
        let url = VirtualDocumentUri::new(&host, "brainfuck", id()).to_url();
        assert!(url.as_str().ends_with(".txt"), "{url}");
    }

    #[test]
    fn test_preserves_percent_encoding_in_path() {
        let host = Url::parse("file:///my%20project/main.rs").unwrap();
        let url = VirtualDocumentUri::new(&host, "sql", id()).to_url();
        assert!(url.as_str().starts_with("file:///my%20project/utsushi-virtual-uri-"), "{url}");
    }

    #[test]
    fn test_cannot_be_a_base_host_uses_fallback_scheme() {
        let host = Url::parse("untitled:Untitled-1").unwrap();
        let url = VirtualDocumentUri::new(&host, "sql", id()).to_url();
        assert_eq!(url.scheme(), "utsushi");
        assert!(url.as_str().contains("untitled%3AUntitled%2D1"), "{url}");
        assert_eq!(VirtualDocumentUri::parse_id(&url), Some(id()));
    }

    #[test]
    fn test_parse_id_round_trips_and_rejects_real_files() {
        let host = Url::parse("file:///project/main.rs").unwrap();
        let url = VirtualDocumentUri::new(&host, "lua", id()).to_url();
        assert_eq!(VirtualDocumentUri::parse_id(&url), Some(id()));
        assert!(VirtualDocumentUri::is_virtual(&url));
        assert!(!VirtualDocumentUri::is_virtual(&host));

        let no_extension = Url::parse(&format!("file:///utsushi-virtual-uri-{ID}.")).unwrap();
        assert!(!VirtualDocumentUri::is_virtual(&no_extension));
    }
}
