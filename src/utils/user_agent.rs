// User agent inspection for the mobile/desktop handoff decision
use actix_web::HttpRequest;

use crate::models::DeviceClass;

/// Substrings that mark a device as mobile
///
/// Matching is case-sensitive: real devices send these exact spellings.
/// The classification only selects a presentation (deep link vs. web
/// redirect), never an access decision.
const MOBILE_MARKERS: [&str; 4] = ["iPhone", "iPad", "iPod", "Android"];

/// Classify a User-Agent string as mobile or desktop
#[must_use]
pub fn classify_user_agent(user_agent: &str) -> DeviceClass {
    if MOBILE_MARKERS
        .iter()
        .any(|marker| user_agent.contains(marker))
    {
        DeviceClass::Mobile
    } else {
        DeviceClass::Desktop
    }
}

/// Classify the device behind a request from its `User-Agent` header
///
/// A missing or unreadable header classifies as desktop, which keeps the
/// user on the web flow instead of dead-ending in a deep link.
#[must_use]
pub fn device_class_from_request(req: &HttpRequest) -> DeviceClass {
    req.headers()
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .map_or(DeviceClass::Desktop, classify_user_agent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RequestBuilder;

    #[test]
    fn test_mobile_markers_classify_as_mobile() {
        assert_eq!(
            classify_user_agent("Mozilla/5.0 (iPhone; CPU iPhone OS 15_0 like Mac OS X)"),
            DeviceClass::Mobile
        );
        assert_eq!(
            classify_user_agent("Mozilla/5.0 (iPad; CPU OS 15_0 like Mac OS X)"),
            DeviceClass::Mobile
        );
        assert_eq!(
            classify_user_agent("Mozilla/5.0 (iPod touch; CPU iPhone OS 14_6 like Mac OS X)"),
            DeviceClass::Mobile
        );
        assert_eq!(
            classify_user_agent("Mozilla/5.0 (Linux; Android 11; SM-G991B)"),
            DeviceClass::Mobile
        );
    }

    #[test]
    fn test_desktop_user_agents_classify_as_desktop() {
        assert_eq!(
            classify_user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64)"),
            DeviceClass::Desktop
        );
        assert_eq!(
            classify_user_agent("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)"),
            DeviceClass::Desktop
        );
        assert_eq!(
            classify_user_agent("Mozilla/5.0 (X11; Linux x86_64)"),
            DeviceClass::Desktop
        );
        assert_eq!(classify_user_agent("curl/7.68.0"), DeviceClass::Desktop);
        assert_eq!(classify_user_agent(""), DeviceClass::Desktop);
    }

    #[test]
    fn test_match_is_case_sensitive() {
        // Real devices send the capitalized spellings; a lowercase variant
        // is not something a handset produces
        assert_eq!(classify_user_agent("android 11"), DeviceClass::Desktop);
        assert_eq!(classify_user_agent("iphone os"), DeviceClass::Desktop);
    }

    #[test]
    fn test_device_class_from_request() {
        let mobile_req = RequestBuilder::mobile_request();
        assert_eq!(device_class_from_request(&mobile_req), DeviceClass::Mobile);

        let desktop_req = RequestBuilder::desktop_request();
        assert_eq!(
            device_class_from_request(&desktop_req),
            DeviceClass::Desktop
        );

        // No User-Agent header at all falls back to desktop
        let empty_req = RequestBuilder::empty_request();
        assert_eq!(device_class_from_request(&empty_req), DeviceClass::Desktop);
    }
}
