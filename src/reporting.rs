use std::collections::HashMap;
use std::io::Write;

use clap::ValueEnum;
use csv::Writer;
use itertools::Itertools;

use crate::dns::{RecordKind, ResolutionResult};
use crate::probe::ProbeResult;
use crate::scan::ScanReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
    Csv,
}

/// Writes `report` to `out`. Every candidate gets a line; unresolved and
/// unprobed ones show `N/A`.
pub fn render<W: Write>(
    report: &ScanReport,
    format: Format,
    out: &mut W,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    match format {
        Format::Text => render_text(report, out)?,
        Format::Json => {
            serde_json::to_writer_pretty(&mut *out, report)?;
            writeln!(out)?;
        }
        Format::Csv => render_csv(report, out)?,
    }
    out.flush()?;
    Ok(())
}

fn probes_by_host(report: &ScanReport) -> HashMap<&str, &ProbeResult> {
    report
        .probes
        .iter()
        .map(|p| (p.resolution.subdomain.as_str(), p))
        .collect()
}

fn addresses_field(result: &ResolutionResult) -> String {
    match &result.addresses {
        Some(addresses) if !addresses.is_empty() => addresses.iter().join(", "),
        _ => "N/A".to_string(),
    }
}

fn status_field(probe: Option<&&ProbeResult>) -> String {
    probe
        .and_then(|p| p.http_status)
        .map_or("N/A".to_string(), |s| s.to_string())
}

fn reachable_field(probe: Option<&&ProbeResult>) -> String {
    probe.map_or("N/A".to_string(), |p| p.http_reachable.to_string())
}

fn render_text<W: Write>(report: &ScanReport, out: &mut W) -> std::io::Result<()> {
    let probes = probes_by_host(report);

    writeln!(
        out,
        "Subdomains in {} (mode {}, {} candidates, {:.1}s)",
        report.domain,
        report.mode,
        report.summary.total,
        report.elapsed.as_secs_f64()
    )?;
    writeln!(out, "=============================================")?;

    for result in &report.resolutions {
        let probe = probes.get(result.subdomain.as_str());
        writeln!(
            out,
            "{:<45} {:<10} addresses={} httpStatus={} httpReachable={}",
            result.subdomain,
            result.record_type,
            addresses_field(result),
            status_field(probe),
            reachable_field(probe)
        )?;
    }

    writeln!(out)?;
    for kind in RecordKind::ALL {
        writeln!(out, "DNS type {}: {}", kind, report.summary.count(kind))?;
    }
    writeln!(
        out,
        "Resolved: {}/{}  Probed: {}  Reachable: {}",
        report.summary.resolved,
        report.summary.total,
        report.summary.probed,
        report.summary.reachable
    )?;
    Ok(())
}

fn render_csv<W: Write>(
    report: &ScanReport,
    out: &mut W,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let probes = probes_by_host(report);
    let mut wtr = Writer::from_writer(out);
    wtr.write_record([
        "subdomain",
        "type",
        "addresses",
        "http_status",
        "http_reachable",
    ])?;

    for result in &report.resolutions {
        let probe = probes.get(result.subdomain.as_str());
        let addresses = result
            .addresses
            .as_ref()
            .map_or(String::new(), |a| a.iter().join(";"));
        let status = probe
            .and_then(|p| p.http_status)
            .map_or(String::new(), |s| s.to_string());
        let reachable = probe.map_or(String::new(), |p| p.http_reachable.to_string());

        wtr.write_record([
            result.subdomain.as_str(),
            result.record_type.as_str(),
            addresses.as_str(),
            status.as_str(),
            reachable.as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeOutcome;
    use crate::scan::ScanSummary;
    use crate::wordlist::Mode;
    use chrono::Utc;
    use std::time::Duration;

    fn sample() -> ScanReport {
        let resolutions = vec![
            ResolutionResult {
                subdomain: "www.example.com".into(),
                record_type: RecordKind::A,
                addresses: Some(vec!["93.184.216.34".into(), "93.184.216.35".into()]),
            },
            ResolutionResult {
                subdomain: "api.example.com".into(),
                record_type: RecordKind::Cname,
                addresses: Some(vec!["edge.example.net.".into()]),
            },
            ResolutionResult::unresolved("ghost.example.com"),
        ];
        let probes = vec![ProbeResult::new(
            resolutions[0].clone(),
            ProbeOutcome {
                status: Some(200),
                reachable: true,
            },
        )];
        ScanReport {
            domain: "example.com".into(),
            mode: Mode::Test,
            started_at: Utc::now(),
            elapsed: Duration::from_millis(1500),
            summary: ScanSummary::from_results(&resolutions, &probes),
            resolutions,
            probes,
        }
    }

    fn rendered(format: Format) -> String {
        let mut buf = Vec::new();
        render(&sample(), format, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn text_lists_every_candidate_and_totals() {
        let text = rendered(Format::Text);
        assert!(text.contains("Subdomains in example.com (mode test, 3 candidates, 1.5s)"));
        assert!(text.contains(
            "addresses=93.184.216.34, 93.184.216.35 httpStatus=200 httpReachable=true"
        ));
        assert!(text.contains("api.example.com"));
        assert!(text.contains("addresses=edge.example.net. httpStatus=N/A httpReachable=N/A"));
        assert!(text.contains("ghost.example.com"));
        assert!(text.contains("DNS type CNAME: 1"));
        assert!(text.contains("DNS type UNRESOLVED: 1"));
        assert!(text.contains("DNS type MX: 0"));
        assert!(text.contains("Resolved: 2/3  Probed: 1  Reachable: 1"));
    }

    #[test]
    fn csv_has_one_row_per_candidate() {
        let csv = rendered(Format::Csv);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "subdomain,type,addresses,http_status,http_reachable");
        assert_eq!(
            lines[1],
            "www.example.com,A,93.184.216.34;93.184.216.35,200,true"
        );
        assert_eq!(lines[2], "api.example.com,CNAME,edge.example.net.,,");
        assert_eq!(lines[3], "ghost.example.com,UNRESOLVED,,,");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn json_carries_results_and_summary() {
        let value: serde_json::Value = serde_json::from_str(&rendered(Format::Json)).unwrap();
        assert_eq!(value["domain"], "example.com");
        assert_eq!(value["mode"], "test");
        assert_eq!(value["elapsed"], 1500);
        assert_eq!(value["resolutions"].as_array().unwrap().len(), 3);
        assert_eq!(value["probes"][0]["httpStatus"], 200);
        assert_eq!(value["summary"]["by_type"]["UNRESOLVED"], 1);
        assert_eq!(value["summary"]["by_type"]["AAAA"], 0);
    }
}
