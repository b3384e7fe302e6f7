//! Inspect command implementation.

use rbf_core::Scanner;
use rbf_storage::FileBackend;
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// One listed frame, as reported by `inspect`.
#[derive(Debug, Serialize)]
struct FrameReport {
    address: u64,
    tag: u32,
    payload_length: u32,
    tombstone: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload_prefix: Option<String>,
}

/// Runs the inspect command.
pub fn run(
    path: &Path,
    limit: Option<usize>,
    format: &str,
    payload_bytes: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let backend = FileBackend::open(path)?;
    let scanner = Scanner::new(&backend);

    let mut reports = Vec::new();
    for frame in scanner.scan_reverse() {
        if let Some(limit) = limit {
            if reports.len() >= limit {
                break;
            }
        }

        let payload_prefix = if payload_bytes > 0 {
            scanner.read_payload(&frame).map(|payload| {
                let shown = payload.len().min(payload_bytes);
                hex_string(&payload[..shown])
            })
        } else {
            None
        };

        reports.push(FrameReport {
            address: frame.file_offset,
            tag: frame.tag.as_u32(),
            payload_length: frame.payload_length,
            tombstone: frame.is_tombstone(),
            payload_prefix,
        });
    }

    debug!(frames = reports.len(), "reverse scan complete");

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
        _ => {
            println!("Inspecting {:?} ({} frames, newest first)", path, reports.len());
            println!();
            for report in &reports {
                let kind = if report.tombstone { "tombstone" } else { "live" };
                print!(
                    "  @{:<12} tag={:#010x} len={:<10} {}",
                    report.address, report.tag, report.payload_length, kind
                );
                if let Some(prefix) = &report.payload_prefix {
                    print!("  [{prefix}]");
                }
                println!();
            }
        }
    }

    Ok(())
}

fn hex_string(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}
