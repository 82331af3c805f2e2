//! Upload session: process-unique identifier plus the sending flag.
//!
//! The session identifier correlates the multipart POST with the monitor's
//! progress queries on the server side. Exactly one send operation is active
//! per widget at a time; the transition methods return whether the state
//! actually changed so callers know if an event should fire.

/// One logical upload operation owned by a widget.
#[derive(Debug)]
pub struct UploadSession {
    process_id: String,
    sending: bool,
}

impl UploadSession {
    /// Creates a session with a fresh identifier: 16 random bytes, hex-encoded.
    pub fn new() -> Self {
        let bytes: [u8; 16] = rand::random();
        Self {
            process_id: hex::encode(bytes),
            sending: false,
        }
    }

    /// The process-unique session identifier (32 hex characters).
    pub fn process_id(&self) -> &str {
        &self.process_id
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    /// Marks the session as sending. Returns false (no-op) if already sending.
    pub fn send(&mut self) -> bool {
        if self.sending {
            return false;
        }
        self.sending = true;
        true
    }

    /// Marks the send operation as canceled. Returns false if not sending.
    pub fn cancel(&mut self) -> bool {
        if !self.sending {
            return false;
        }
        self.sending = false;
        true
    }

    /// Marks the send operation as completed. Returns false if not sending.
    pub fn complete(&mut self) -> bool {
        if !self.sending {
            return false;
        }
        self.sending = false;
        true
    }
}

impl Default for UploadSession {
    fn default() -> Self {
        Self::new()
    }
}
