//! `ascan resolve` - run every rule once and print the resolution

use std::io::Write;
use std::path::Path;

use audit_scan_app::config::load_settings;
use audit_scan_app::Resolver;
use audit_scan_core::prelude::*;
use audit_scan_core::{Resolution, ScanEvent, Symbology};

use crate::options::ScanOptions;

/// Resolve `payload` and write the resolution to `out` as pretty JSON.
///
/// In picking modes a no-op continuation is installed so the continuation
/// rule can match; the `invoke` step in the output shows the value it would
/// receive.
pub async fn run_resolve<W: Write>(
    project_path: &Path,
    options: &ScanOptions,
    payload: &str,
    symbology: Option<&str>,
    out: &mut W,
) -> Result<Resolution> {
    let settings = load_settings(project_path);
    let resolver = Resolver::new(&settings);
    let lookup = options.load_lookup()?;

    let mut context = options.context();
    if let Some(slot) = options.mode.continuation_slot() {
        context = context.with_continuation(slot, Box::new(|_| Ok(())));
    }

    let symbology = symbology
        .map(Symbology::from_device_name)
        .unwrap_or(Symbology::Qr);
    let event = ScanEvent::new(payload, symbology);

    let resolution = resolver
        .resolve(&event, &context, &lookup, options.host_available)
        .await;

    let json = serde_json::to_string_pretty(&resolution)?;
    writeln!(out, "{}", json)?;
    Ok(resolution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_scan_core::{InteractionMode, ResolutionOutcome, Rule};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_resolve_prints_json() {
        let dir = tempdir().unwrap();
        let mut out = Vec::new();
        let resolution = run_resolve(
            dir.path(),
            &ScanOptions::new(InteractionMode::Browse),
            "property-42-room-7",
            None,
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(resolution.rule, Rule::StructuredLocation);
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["rule"], "structured_location");
        assert_eq!(json["outcomes"][0]["destination"], "RoomView");
        assert_eq!(json["outcomes"][0]["params"]["roomId"], "7");
    }

    #[tokio::test]
    async fn test_resolve_pick_mode_shows_invoke() {
        let dir = tempdir().unwrap();
        let mut out = Vec::new();
        let resolution = run_resolve(
            dir.path(),
            &ScanOptions::new(InteractionMode::PickRoom),
            "ABC123",
            Some("code128"),
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(resolution.rule, Rule::ModeContinuation);
        assert_eq!(resolution.outcomes[1], ResolutionOutcome::ReturnToCaller);
    }

    #[tokio::test]
    async fn test_resolve_without_host_prompts() {
        let dir = tempdir().unwrap();
        let options = ScanOptions {
            host_available: false,
            ..ScanOptions::new(InteractionMode::Browse)
        };
        let mut out = Vec::new();
        let resolution = run_resolve(dir.path(), &options, "unknown-code", None, &mut out)
            .await
            .unwrap();

        assert_eq!(
            resolution.outcomes,
            vec![ResolutionOutcome::Prompt {
                message: "unknown-code".to_string()
            }]
        );
    }
}
