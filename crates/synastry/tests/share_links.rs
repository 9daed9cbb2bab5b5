use chrono::NaiveDate;
use proptest::prelude::*;
use synastry::request::{BirthProfile, Location, ReportRequest};
use synastry::share::{decode_link, encode_link, InvalidLinkError};

fn profile_strategy() -> impl Strategy<Value = BirthProfile> {
    (
        proptest::option::of("\\PC{0,24}"),
        (1900i32..2100, 1u32..=12, 1u32..=28),
        (0u32..24, 0u32..60, 0u32..60),
        "[A-Za-z_]{1,12}/[A-Za-z_]{1,16}",
        (-90.0f64..90.0, -180.0f64..180.0, "\\PC{0,32}"),
    )
        .prop_map(|(name, (y, m, d), (hh, mm, ss), tz_str, (lat, lng, city))| {
            let datetime = NaiveDate::from_ymd_opt(y, m, d)
                .and_then(|date| date.and_hms_opt(hh, mm, ss))
                .expect("valid generated datetime");
            BirthProfile {
                name,
                datetime,
                tz_str,
                location: Location { lat, lng, city },
            }
        })
}

fn request_strategy() -> impl Strategy<Value = ReportRequest> {
    (profile_strategy(), profile_strategy(), any::<bool>()).prop_map(|(a, b, inclusions)| {
        let request = ReportRequest::new(a, b);
        if inclusions {
            request.with_report_inclusions()
        } else {
            request
        }
    })
}

proptest! {
    #[test]
    fn links_round_trip(request in request_strategy()) {
        let link = encode_link(&request).expect("encodes");
        prop_assert_eq!(decode_link(&link).expect("decodes"), request);
    }

    #[test]
    fn links_survive_query_mangling(request in request_strategy()) {
        let link = encode_link(&request).expect("encodes");

        let unpadded = link.trim_end_matches('=');
        prop_assert_eq!(&decode_link(unpadded).expect("unpadded"), &request);

        let spaced = link.replace('+', " ");
        prop_assert_eq!(&decode_link(&spaced).expect("spaced"), &request);

        let url_safe = link.replace('+', "-").replace('/', "_");
        prop_assert_eq!(&decode_link(&url_safe).expect("url-safe"), &request);
    }
}

#[test]
fn non_ascii_names_survive() {
    let date = NaiveDate::from_ymd_opt(1988, 11, 2).expect("date");
    let request = ReportRequest::new(
        BirthProfile::new(
            Some("Zoë 李".to_string()),
            date,
            None,
            Some("Asia/Shanghai".to_string()),
            Location {
                lat: 31.2304,
                lng: 121.4737,
                city: "上海".to_string(),
            },
        ),
        BirthProfile::new(
            Some("Åsa".to_string()),
            date,
            None,
            None,
            Location {
                lat: 59.3293,
                lng: 18.0686,
                city: "Stockholm".to_string(),
            },
        ),
    );

    let decoded = decode_link(&encode_link(&request).expect("encodes")).expect("decodes");
    assert_eq!(decoded.person_a.display_name(), "Zoë 李");
    assert_eq!(decoded.person_b.tz_str, "UTC");
    assert_eq!(decoded, request);
}

#[test]
fn malformed_links_are_typed_failures() {
    assert!(matches!(decode_link(""), Err(InvalidLinkError::Missing)));
    assert!(matches!(decode_link("   "), Err(InvalidLinkError::Missing)));
    assert!(matches!(
        decode_link("%%%"),
        Err(InvalidLinkError::Encoding(_))
    ));
    // "/w==" decodes to the single byte 0xff.
    assert!(matches!(decode_link("/w=="), Err(InvalidLinkError::Utf8(_))));
    // "eyJ4IjoxfQ" is `{"x":1}`.
    assert!(matches!(
        decode_link("eyJ4IjoxfQ"),
        Err(InvalidLinkError::Payload(_))
    ));
}
