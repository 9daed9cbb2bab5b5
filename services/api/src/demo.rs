use crate::infra::http_client;
use chrono::{NaiveDate, NaiveTime};
use clap::Args;
use std::path::PathBuf;
use synastry::config::AppConfig;
use synastry::error::AppError;
use synastry::report::{
    explore, resolve_highlights, share_summary_text, AspectCardView, ExplorerQuery, Report,
};
use synastry::request::{BirthProfile, Location, ReportRequest};
use synastry::share::{decode_link, encode_link, report_path};
use synastry::upstream::Endpoint;

/// Fixture dates are evaluated in const context, so a bad one fails the build.
const fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => date,
        None => panic!("fixture date out of range"),
    }
}

const fn time(hour: u32, minute: u32) -> NaiveTime {
    match NaiveTime::from_hms_opt(hour, minute, 0) {
        Some(time) => time,
        None => panic!("fixture time out of range"),
    }
}

const SAMPLE_A: (NaiveDate, NaiveTime) = (date(1990, 6, 15), time(10, 0));
const SAMPLE_B: (NaiveDate, NaiveTime) = (date(1993, 3, 20), time(14, 30));
const DIAGNOSTIC: (NaiveDate, NaiveTime) = (date(1990, 1, 1), time(12, 0));

fn profile(
    (date, time): (NaiveDate, NaiveTime),
    tz_str: &str,
    (lat, lng, city): (f64, f64, &str),
) -> BirthProfile {
    BirthProfile::new(
        None,
        date,
        Some(time),
        Some(tz_str.to_string()),
        Location {
            lat,
            lng,
            city: city.to_string(),
        },
    )
}

/// Sample pair served by `GET /api/synastry`.
pub(crate) fn sample_request() -> ReportRequest {
    ReportRequest::new(
        profile(SAMPLE_A, "Europe/Paris", (48.8566, 2.3522, "Paris")),
        profile(SAMPLE_B, "Europe/London", (51.5074, -0.1278, "London")),
    )
}

/// Fixed pair behind the diagnostic route.
pub(crate) fn diagnostic_request() -> ReportRequest {
    ReportRequest::new(
        profile(DIAGNOSTIC, "Europe/Paris", (48.8566, 2.3522, "Paris")),
        profile(DIAGNOSTIC, "Europe/London", (51.5074, -0.1278, "London")),
    )
}

#[derive(Args, Debug)]
pub(crate) struct EncodeArgs {
    /// JSON file holding a report request (`person_a`, `person_b`, optional `settings`)
    pub(crate) file: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct DecodeArgs {
    /// Value of the `q` parameter from a shared link
    pub(crate) link: String,
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Value of the `q` parameter from a shared link
    pub(crate) link: String,
    /// Print the normalized report as JSON instead of the text summary
    #[arg(long)]
    pub(crate) raw: bool,
}

pub(crate) fn run_encode(args: EncodeArgs) -> Result<(), AppError> {
    let contents = std::fs::read_to_string(&args.file)?;
    let request: ReportRequest = serde_json::from_str(&contents)?;
    println!("{}", encode_link(&request)?);
    println!("{}", report_path(&request)?);
    Ok(())
}

pub(crate) fn run_decode(args: DecodeArgs) -> Result<(), AppError> {
    let request = decode_link(&args.link)?;
    println!("{}", serde_json::to_string_pretty(&request)?);
    Ok(())
}

pub(crate) async fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let request = decode_link(&args.link)?;
    let config = AppConfig::load()?;
    let client = http_client(config.upstream)?;
    let report = client.retrieve_report(&request, Endpoint::Cards).await?;

    if args.raw {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_report(&request, &report));
    }
    Ok(())
}

pub(crate) fn render_report(request: &ReportRequest, report: &Report) -> String {
    let mut out = format!(
        "{} & {}\n\n{}\n",
        request.person_a.display_name(),
        request.person_b.display_name(),
        share_summary_text(&report.summary)
    );

    let strengths = resolve_highlights(&report.summary.strengths, &report.aspects);
    let challenges = resolve_highlights(&report.summary.challenges, &report.aspects);
    if !strengths.is_empty() || !challenges.is_empty() {
        out.push_str("\nHighlights\n");
        for aspect in strengths {
            out.push_str(&format!("  + {}\n", aspect.label));
        }
        for aspect in challenges {
            out.push_str(&format!("  - {}\n", aspect.label));
        }
    }

    let view = explore(&report.aspects, ExplorerQuery::default());
    out.push_str(&format!(
        "\nAspects ({} of {})\n",
        view.displayed.len(),
        view.matching
    ));
    for aspect in &view.displayed {
        let card = AspectCardView::new(aspect);
        out.push_str(&format!(
            "  {:<32} {:<12} {:>5}  {} {}\n",
            card.label,
            card.strength_label,
            card.polarity_pct,
            card.lean.label(),
            "|".repeat(usize::from(card.intensity))
        ));
        out.push_str(&format!("      {}: {}\n", card.title, card.one_liner));
        if !card.domain_labels.is_empty() {
            out.push_str(&format!("      [{}]\n", card.domain_labels.join(", ")));
        }
        if let Some(flip) = card.flip_title {
            out.push_str(&format!("      flip side: {flip}\n"));
        }
    }
    if view.has_more() {
        out.push_str("  ...\n");
    }
    out
}
