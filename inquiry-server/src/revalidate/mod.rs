//! CMS-driven cache revalidation.
//!
//! The CMS calls the revalidation webhook whenever a document is published.
//! The document's `_type` decides which rendered pages go stale:
//!
//! ```text
//! homePage          → /
//! galleryPage       → /gallery
//! cookieInquiryPage → /cookie-inquiry
//! contactPage       → /contact-us
//! siteSettings      → layout (every page)
//! anything else     → layout (every page)
//! ```

pub mod cache;

use std::fmt;

use serde_json::Value;

pub use cache::PageCache;

/// Every page the site renders, in navigation order.
pub const SITE_PAGES: [&str; 4] = ["/", "/gallery", "/cookie-inquiry", "/contact-us"];

/// Part of the rendered site to mark stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheScope {
    /// A single page path.
    Page(&'static str),
    /// The shared layout, which every page renders through.
    Layout,
}

impl CacheScope {
    pub fn paths(self) -> Vec<&'static str> {
        match self {
            CacheScope::Page(path) => vec![path],
            CacheScope::Layout => SITE_PAGES.to_vec(),
        }
    }
}

/// CMS document type named by the webhook payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentType {
    HomePage,
    GalleryPage,
    CookieInquiryPage,
    ContactPage,
    SiteSettings,
    /// Unrecognized or missing `_type`.
    Unknown(Option<String>),
}

impl ContentType {
    pub fn from_type_name(name: Option<&str>) -> Self {
        match name {
            Some("homePage") => ContentType::HomePage,
            Some("galleryPage") => ContentType::GalleryPage,
            Some("cookieInquiryPage") => ContentType::CookieInquiryPage,
            Some("contactPage") => ContentType::ContactPage,
            Some("siteSettings") => ContentType::SiteSettings,
            other => ContentType::Unknown(other.map(str::to_string)),
        }
    }

    /// Read `_type` from a webhook body. A body that is not an object, or a
    /// `_type` that is not a string, is unrecognized.
    pub fn from_payload(payload: &Value) -> Self {
        match payload.get("_type") {
            Some(Value::String(name)) => Self::from_type_name(Some(name)),
            None | Some(Value::Null) => Self::from_type_name(None),
            Some(other) => ContentType::Unknown(Some(other.to_string())),
        }
    }

    pub fn scope(&self) -> CacheScope {
        match self {
            ContentType::HomePage => CacheScope::Page("/"),
            ContentType::GalleryPage => CacheScope::Page("/gallery"),
            ContentType::CookieInquiryPage => CacheScope::Page("/cookie-inquiry"),
            ContentType::ContactPage => CacheScope::Page("/contact-us"),
            ContentType::SiteSettings | ContentType::Unknown(_) => CacheScope::Layout,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContentType::HomePage => "homePage",
            ContentType::GalleryPage => "galleryPage",
            ContentType::CookieInquiryPage => "cookieInquiryPage",
            ContentType::ContactPage => "contactPage",
            ContentType::SiteSettings => "siteSettings",
            ContentType::Unknown(Some(name)) => name,
            ContentType::Unknown(None) => "unknown",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_types_map_to_single_path() {
        let cases = [
            ("homePage", "/"),
            ("galleryPage", "/gallery"),
            ("cookieInquiryPage", "/cookie-inquiry"),
            ("contactPage", "/contact-us"),
        ];
        for (name, path) in cases {
            let content = ContentType::from_type_name(Some(name));
            assert_eq!(content.scope(), CacheScope::Page(path));
            assert_eq!(content.scope().paths(), vec![path]);
            assert_eq!(content.to_string(), name);
        }
    }

    #[test]
    fn test_site_settings_and_unknown_hit_layout() {
        assert_eq!(
            ContentType::from_type_name(Some("siteSettings")).scope(),
            CacheScope::Layout
        );

        let unknown = ContentType::from_type_name(Some("blogPost"));
        assert_eq!(unknown, ContentType::Unknown(Some("blogPost".to_string())));
        assert_eq!(unknown.scope(), CacheScope::Layout);
        assert_eq!(unknown.to_string(), "blogPost");

        let missing = ContentType::from_type_name(None);
        assert_eq!(missing.scope(), CacheScope::Layout);
        assert_eq!(missing.to_string(), "unknown");

        assert_eq!(CacheScope::Layout.paths(), SITE_PAGES.to_vec());
    }

    #[test]
    fn test_from_payload() {
        use serde_json::json;

        assert_eq!(
            ContentType::from_payload(&json!({"_type": "galleryPage", "_id": "abc"})),
            ContentType::GalleryPage
        );
        assert_eq!(
            ContentType::from_payload(&json!({"_id": "abc"})),
            ContentType::Unknown(None)
        );
        assert_eq!(
            ContentType::from_payload(&json!({"_type": null})),
            ContentType::Unknown(None)
        );

        let numeric = ContentType::from_payload(&json!({"_type": 42}));
        assert_eq!(numeric, ContentType::Unknown(Some("42".to_string())));
        assert_eq!(numeric.scope(), CacheScope::Layout);

        assert_eq!(ContentType::from_payload(&json!([1, 2])), ContentType::Unknown(None));
        assert_eq!(ContentType::from_payload(&json!("homePage")), ContentType::Unknown(None));
        assert_eq!(ContentType::from_payload(&Value::Null), ContentType::Unknown(None));
    }
}
