//! [`SerialTransport`] – frames over an RS-232 / USB serial port.
//!
//! The port is opened in 8N1 mode without flow control.  Writes are blocking:
//! every frame is written in full and flushed before the call returns.

use std::io::Write;
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use lightcraft_types::RelayError;

use crate::transport::Transport;

/// Line settings applied when the port is opened.
#[derive(Debug, Clone, PartialEq)]
pub struct SerialSettings {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
    /// Upper bound on a single blocking write.
    pub write_timeout: Duration,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            write_timeout: Duration::from_millis(100),
        }
    }
}

impl SerialSettings {
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }
}

/// An open serial device.
pub struct SerialTransport {
    port_name: String,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    /// Open `port_name` with `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Transport`] if the device cannot be opened or
    /// configured.
    pub fn open(port_name: &str, settings: &SerialSettings) -> Result<Self, RelayError> {
        let port = serialport::new(port_name, settings.baud_rate)
            .data_bits(settings.data_bits)
            .parity(settings.parity)
            .stop_bits(settings.stop_bits)
            .flow_control(settings.flow_control)
            .timeout(settings.write_timeout)
            .open()
            .map_err(|e| RelayError::Transport {
                port: port_name.to_string(),
                details: e.to_string(),
            })?;

        info!(
            port = port_name,
            baud_rate = settings.baud_rate,
            "serial port opened"
        );

        Ok(Self {
            port_name: port_name.to_string(),
            port: Some(port),
        })
    }

    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn fault(&self, details: impl Into<String>) -> RelayError {
        RelayError::Transport {
            port: self.port_name.clone(),
            details: details.into(),
        }
    }
}

impl Transport for SerialTransport {
    fn id(&self) -> &str {
        &self.port_name
    }

    fn write_frame(&mut self, bytes: &[u8]) -> Result<(), RelayError> {
        let port = self.port.as_mut().ok_or_else(|| RelayError::Transport {
            port: self.port_name.clone(),
            details: "port is closed".to_string(),
        })?;
        let result = port.write_all(bytes).and_then(|()| port.flush());
        result.map_err(|e| self.fault(e.to_string()))
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!(port = %self.port_name, "serial port closed");
        }
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_115200_8n1_without_flow_control() {
        let s = SerialSettings::default();
        assert_eq!(s.baud_rate, 115_200);
        assert_eq!(s.data_bits, DataBits::Eight);
        assert_eq!(s.parity, Parity::None);
        assert_eq!(s.stop_bits, StopBits::One);
        assert_eq!(s.flow_control, FlowControl::None);
    }

    #[test]
    fn with_baud_rate_overrides_only_baud() {
        let s = SerialSettings::default().with_baud_rate(57_600);
        assert_eq!(s.baud_rate, 57_600);
        assert_eq!(s.parity, Parity::None);
    }

    #[test]
    fn opening_missing_device_is_transport_fault() {
        let err = SerialTransport::open(
            "/dev/lightcraft-does-not-exist",
            &SerialSettings::default(),
        )
        .err()
        .expect("open must fail");
        match err {
            RelayError::Transport { port, .. } => {
                assert_eq!(port, "/dev/lightcraft-does-not-exist")
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
