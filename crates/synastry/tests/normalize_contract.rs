use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use synastry::normalize::{normalize, ShapeError, UpstreamPayload};
use synastry::report::{Domain, Polarity, ScoreKey};

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 1, 8, 30, 0)
        .single()
        .expect("valid timestamp")
}

fn synastry_fixture() -> Value {
    json!({
        "meta": { "settings_resolved": { "zodiac": "sidereal" } },
        "synastry": {
            "archetype": { "label": "Twin Flames", "confidence": 0.72, "one_liner": "Mirrors." },
            "scores": {
                "overall": 68,
                "romance": 74,
                "tension": 41,
                "contributors": { "romance": ["a_venus_b_mars"] },
                "karma": 99
            },
            "aspects": [
                { "pair_key": "a_venus_b_mars", "strength": 0.91, "polarity": "supportive",
                  "text_key": "venus_mars", "domains": ["romance", "intimacy"] },
                { "pair_key": "a_mars_b_saturn", "strength": 0.66, "polarity": "friction",
                  "text_key": "mars_saturn", "domains": ["tension"] },
                { "pair_key": "a_moon_b_moon", "strength": 0.4, "polarity": "easy" },
                { "pair_key": "a_sun_b_pluto", "strength": 0.8, "polarity": "challenging" },
                { "pair_key": "a_venus_b_mars", "strength": 0.1, "polarity": "challenging" }
            ]
        },
        "text": {
            "by_key": {
                "venus_mars": { "title": "Magnetic Pull", "summary": "Sparks.", "detail": "Long form." },
                "mars_saturn": { "title": "Brakes", "summary": "Slowdowns." }
            }
        }
    })
}

fn cards_fixture() -> Value {
    json!({
        "summary": {
            "scores": { "overall": 55, "growth": 62, "communication": "n/a" },
            "drivers_by_domain": { "romance": ["x", "missing"] }
        },
        "aspects": [
            { "key": "x", "label": "X", "strength_value": 0.6, "polarity": "supportive",
              "blocks": { "supportive": { "title": "Good", "one_liner": "Yes.", "insight": "More." } } },
            { "key": "y", "label": "Y", "strength_value": 0.9, "polarity": "challenging",
              "blocks": { "challenging": { "title": "Hard", "one_liner": "No.", "insight": "Less." } } }
        ]
    })
}

#[test]
fn normalizing_twice_is_byte_identical() {
    for payload in [
        UpstreamPayload::Synastry(synastry_fixture()),
        UpstreamPayload::Cards(cards_fixture()),
    ] {
        let first = normalize(payload.clone(), fixed_now()).expect("normalizes");
        let second = normalize(payload, fixed_now()).expect("normalizes");
        assert_eq!(
            serde_json::to_string(&first).expect("serializes"),
            serde_json::to_string(&second).expect("serializes")
        );
    }
}

#[test]
fn score_keys_are_known_and_ordered() {
    for payload in [
        UpstreamPayload::Synastry(synastry_fixture()),
        UpstreamPayload::Cards(cards_fixture()),
    ] {
        let report = normalize(payload, fixed_now()).expect("normalizes");
        let positions: Vec<usize> = report
            .summary
            .scores
            .iter()
            .map(|item| {
                ScoreKey::ORDERED
                    .iter()
                    .position(|key| *key == item.key)
                    .expect("known score key")
            })
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }
}

#[test]
fn synastry_shape_end_to_end() {
    let report = normalize(UpstreamPayload::Synastry(synastry_fixture()), fixed_now())
        .expect("normalizes");

    assert_eq!(report.aspects.len(), 4, "duplicate key collapses to the first");
    let first = &report.aspects[0];
    assert_eq!(first.strength_value, 0.91);
    assert_eq!(first.domains, vec![Domain::Romance, Domain::Intimacy]);
    assert_eq!(report.aspects[1].polarity, Polarity::Challenging);
    assert_eq!(report.aspects[2].polarity, Polarity::Supportive);

    assert_eq!(report.summary.strengths, vec!["Magnetic Pull", "Unknown Aspect"]);
    assert_eq!(report.summary.challenges.len(), 2);
    assert_eq!(report.summary.challenges[1], "Brakes");
    assert_eq!(report.summary.narrative, "Mirrors.");
    assert_eq!(report.summary.overall_score(), 68.0);

    assert_eq!(report.meta.calculation.zodiac, "sidereal");
    assert_eq!(report.meta.calculation.house_system, "placidus");
    assert_eq!(report.meta.generated_at, "2026-10-01T08:30:00.000Z");
    assert_eq!(
        report.meta.report_id,
        format!("rep_{}", fixed_now().timestamp_millis())
    );
}

#[test]
fn cards_shape_end_to_end() {
    let report =
        normalize(UpstreamPayload::Cards(cards_fixture()), fixed_now()).expect("normalizes");

    assert_eq!(report.summary.strengths, vec!["x"]);
    assert_eq!(report.summary.challenges, vec!["y"]);
    assert_eq!(report.summary.scores.len(), 2);

    let drivers = report
        .summary
        .drivers_by_domain
        .as_ref()
        .expect("drivers present");
    assert_eq!(drivers["romance"][0].contribution, 60);
    assert_eq!(drivers["romance"][1].contribution, 0);
    assert_eq!(drivers["romance"][1].label, "missing");
}

#[test]
fn missing_containers_fail_per_shape() {
    let error = normalize(UpstreamPayload::Synastry(json!({ "text": {} })), fixed_now())
        .expect_err("rejected");
    assert!(matches!(
        error,
        ShapeError::MissingContainer {
            shape: "synastry",
            field: "synastry"
        }
    ));

    let error = normalize(
        UpstreamPayload::Cards(json!({ "synastry": {} })),
        fixed_now(),
    )
    .expect_err("rejected");
    assert!(matches!(error, ShapeError::MissingContainer { shape: "cards", .. }));
}
