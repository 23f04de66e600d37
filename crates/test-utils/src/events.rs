use std::collections::HashMap;
use std::io::Cursor;

/// Serialize one event the way supervisord writes it to a listener.
pub fn envelope(serial: u32, eventname: &str, payload: &str) -> String {
    format!(
        "ver:3.0 server:supervisor serial:{serial} pool:dependentstartup \
         poolserial:{serial} eventname:{eventname} len:{}\n{payload}",
        payload.len()
    )
}

/// Builds the stdin a listener would see from supervisord.
///
/// Tracks the last state of each process so `from_state` is filled in like
/// supervisord does.
#[derive(Default)]
pub struct EventScript {
    buf: Vec<u8>,
    serial: u32,
    last: HashMap<(String, String), String>,
}

impl EventScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// `PROCESS_STATE_<to>` for a program whose group equals its name.
    pub fn state(self, process: &str, to: &str) -> Self {
        self.grouped(process, process, to)
    }

    /// `PROCESS_STATE_<to>` for `group:process`.
    pub fn grouped(mut self, group: &str, process: &str, to: &str) -> Self {
        let to = to.to_ascii_uppercase();
        let from = self
            .last
            .insert((group.to_string(), process.to_string()), to.clone())
            .unwrap_or_else(|| "STOPPED".to_string());
        let payload =
            format!("processname:{process} groupname:{group} from_state:{from} pid:4242");
        self.push(&format!("PROCESS_STATE_{to}"), &payload)
    }

    /// A `TICK_5` event.
    pub fn tick(self) -> Self {
        self.push("TICK_5", "when:1201063880")
    }

    /// Raw bytes, e.g. a malformed header line.
    pub fn raw(self, text: &str) -> Self {
        self.raw_bytes(text.as_bytes())
    }

    /// Bytes that need not be valid UTF-8.
    pub fn raw_bytes(mut self, bytes: &[u8]) -> Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.buf.clone()
    }

    /// A reader for `EventListener::new`.
    pub fn into_reader(self) -> Cursor<Vec<u8>> {
        Cursor::new(self.buf)
    }

    fn push(mut self, eventname: &str, payload: &str) -> Self {
        self.serial += 1;
        let record = envelope(self.serial, eventname, payload);
        self.buf.extend_from_slice(record.as_bytes());
        self
    }
}
