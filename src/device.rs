//! MIDI port discovery and connection.
//!
//! Ports are matched by their exact configured name; `--list-ports` exists
//! so the operator can copy it verbatim. Incoming events are pushed into a
//! bounded channel from midir's callback thread, so the hardware callback
//! never blocks on controller logic.

use anyhow::{Context, Result};
use colored::*;
use midir::{MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::FeedbackError;
use crate::midi::{format_hex, RawMidiEvent};

const CLIENT_NAME: &str = "minilab-mutesync";

/// Information about a MIDI port
#[derive(Debug, Clone)]
pub struct PortInfo {
    pub index: usize,
    pub name: String,
}

/// Discover input ports
pub fn input_ports() -> Result<Vec<PortInfo>> {
    let midi_in = MidiInput::new(CLIENT_NAME).context("Failed to create MIDI input")?;

    let mut port_infos = Vec::new();
    for (index, port) in midi_in.ports().iter().enumerate() {
        if let Ok(name) = midi_in.port_name(port) {
            port_infos.push(PortInfo { index, name });
        }
    }

    Ok(port_infos)
}

/// Discover output ports
pub fn output_ports() -> Result<Vec<PortInfo>> {
    let midi_out = MidiOutput::new(CLIENT_NAME).context("Failed to create MIDI output")?;

    let mut port_infos = Vec::new();
    for (index, port) in midi_out.ports().iter().enumerate() {
        if let Ok(name) = midi_out.port_name(port) {
            port_infos.push(PortInfo { index, name });
        }
    }

    Ok(port_infos)
}

/// Open the output port whose name equals `name`.
pub fn open_output(name: &str) -> Result<MidiOutputConnection> {
    let midi_out = MidiOutput::new(CLIENT_NAME).context("Failed to create MIDI output")?;

    let port = midi_out
        .ports()
        .into_iter()
        .find(|port| {
            midi_out
                .port_name(port)
                .map(|port_name| port_name == name)
                .unwrap_or(false)
        })
        .ok_or_else(|| FeedbackError::DeviceNotFound(name.to_string()))?;

    let connection = midi_out
        .connect(&port, CLIENT_NAME)
        .map_err(|e| FeedbackError::DeviceNotFound(format!("{} (connect failed: {})", name, e)))?;

    info!("Opened MIDI output '{}'", name);
    Ok(connection)
}

/// Open the input port whose name equals `name` and forward pad events
/// into `event_tx`.
///
/// The returned connection must be kept alive for events to keep flowing.
pub fn open_input(
    name: &str,
    event_tx: mpsc::Sender<RawMidiEvent>,
) -> Result<MidiInputConnection<()>> {
    let midi_in = MidiInput::new(CLIENT_NAME).context("Failed to create MIDI input")?;

    let port = midi_in
        .ports()
        .into_iter()
        .find(|port| {
            midi_in
                .port_name(port)
                .map(|port_name| port_name == name)
                .unwrap_or(false)
        })
        .ok_or_else(|| FeedbackError::DeviceNotFound(name.to_string()))?;

    let connection = midi_in
        .connect(
            &port,
            CLIENT_NAME,
            move |_timestamp, data, _| {
                match RawMidiEvent::from_bytes(data) {
                    Some(event) => {
                        // Forward without blocking; the controller drains
                        // the queue on its own task
                        let _ = event_tx.try_send(event);
                    },
                    None => {
                        debug!("Ignoring unparseable MIDI input: {}", format_hex(data));
                    },
                }
            },
            (),
        )
        .map_err(|e| FeedbackError::DeviceNotFound(format!("{} (connect failed: {})", name, e)))?;

    info!("Opened MIDI input '{}'", name);
    Ok(connection)
}

/// Print discovered ports for the operator
pub fn list_ports_formatted() {
    println!("\n{}", "=== MIDI Input Ports ===".bold().cyan());
    match input_ports() {
        Ok(ports) if ports.is_empty() => println!("  {}", "(none)".dimmed()),
        Ok(ports) => {
            for port in ports {
                println!("  {}: {}", port.index, port.name);
            }
        },
        Err(e) => println!("  {}", format!("error: {}", e).red()),
    }

    println!("\n{}", "=== MIDI Output Ports ===".bold().cyan());
    match output_ports() {
        Ok(ports) if ports.is_empty() => println!("  {}", "(none)".dimmed()),
        Ok(ports) => {
            for port in ports {
                println!("  {}: {}", port.index, port.name);
            }
        },
        Err(e) => println!("  {}", format!("error: {}", e).red()),
    }
    println!();
}
