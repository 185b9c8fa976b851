//! Test data model for the fake IMAP server
//!
//! Builder-style construction of mailbox state. Each message carries
//! its full raw bytes plus, optionally, a BODYSTRUCTURE literal and
//! individually addressable MIME parts, so tests can steer every
//! extraction strategy:
//!
//! ```ignore
//! let mailbox = MailboxBuilder::new()
//!     .folder("INBOX")
//!         .message(1, raw_bounce)
//!         .structure(bounce_structure())
//!         .part("2", embedded_original)
//!     .folder("Processed")
//!     .build();
//! ```

/// Folders shared with the running fake server.
#[derive(Debug, Clone)]
pub struct Mailbox {
    pub folders: Vec<Folder>,
}

impl Mailbox {
    pub fn get_folder(&self, name: &str) -> Option<&Folder> {
        self.folders.iter().find(|f| f.name == name)
    }

    pub fn get_folder_mut(&mut self, name: &str) -> Option<&mut Folder> {
        self.folders.iter_mut().find(|f| f.name == name)
    }
}

/// A single IMAP folder.
#[derive(Debug, Clone)]
pub struct Folder {
    pub name: String,
    pub messages: Vec<TestMessage>,
}

/// One stored message.
#[derive(Debug, Clone)]
pub struct TestMessage {
    /// Stable per-folder identifier.
    pub uid: u32,
    /// Complete RFC 2822 message, headers and body.
    pub raw: Vec<u8>,
    /// Addressable MIME parts, keyed by dotted part number.
    pub parts: Vec<(String, Vec<u8>)>,
    /// BODYSTRUCTURE literal to hand out, if any.
    pub structure: Option<String>,
    /// `\Deleted` flag, honored by EXPUNGE and CLOSE.
    pub deleted: bool,
}

impl TestMessage {
    /// The header block, up to and including the blank line.
    pub fn header_bytes(&self) -> Vec<u8> {
        let raw = &self.raw;
        if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
            raw[..pos + 4].to_vec()
        } else {
            raw.clone()
        }
    }

    pub fn part(&self, section: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|(name, _)| name == section)
            .map(|(_, data)| data.as_slice())
    }
}

/// Builder for mailbox state. `.folder()` starts a folder,
/// `.message()` appends to it, `.part()`/`.structure()` refine the
/// most recent message.
pub struct MailboxBuilder {
    folders: Vec<Folder>,
}

impl MailboxBuilder {
    pub fn new() -> Self {
        Self {
            folders: Vec::new(),
        }
    }

    pub fn folder(mut self, name: &str) -> Self {
        self.folders.push(Folder {
            name: name.to_string(),
            messages: Vec::new(),
        });
        self
    }

    /// Add a message to the most recently added folder.
    ///
    /// # Panics
    ///
    /// Panics if called before any `.folder()` call.
    pub fn message(mut self, uid: u32, raw: &[u8]) -> Self {
        self.folders
            .last_mut()
            .expect("call .folder() before .message()")
            .messages
            .push(TestMessage {
                uid,
                raw: raw.to_vec(),
                parts: Vec::new(),
                structure: None,
                deleted: false,
            });
        self
    }

    /// Attach an addressable part to the most recent message.
    ///
    /// # Panics
    ///
    /// Panics if called before any `.message()` call.
    pub fn part(mut self, section: &str, data: &[u8]) -> Self {
        self.last_message().parts.push((section.to_string(), data.to_vec()));
        self
    }

    /// Set the BODYSTRUCTURE literal of the most recent message.
    ///
    /// # Panics
    ///
    /// Panics if called before any `.message()` call.
    pub fn structure(mut self, structure: &str) -> Self {
        self.last_message().structure = Some(structure.to_string());
        self
    }

    fn last_message(&mut self) -> &mut TestMessage {
        self.folders
            .last_mut()
            .expect("call .folder() first")
            .messages
            .last_mut()
            .expect("call .message() before refining it")
    }

    pub fn build(self) -> Mailbox {
        Mailbox {
            folders: self.folders,
        }
    }
}

/// BODYSTRUCTURE of a typical multipart/report bounce: a
/// human-readable text part followed by the returned original as
/// `message/rfc822` (part 2).
pub fn bounce_structure() -> String {
    concat!(
        "((\"text\" \"plain\" (\"charset\" \"utf-8\") NIL NIL \"7bit\" 64 4)",
        "(\"message\" \"rfc822\" NIL NIL NIL \"7bit\" 312 ",
        "(\"Mon, 1 Jan 2024 10:00:00 +0000\" \"Original subject\" ",
        "((NIL NIL \"sender\" \"example.com\")) NIL NIL ",
        "((NIL NIL \"victim\" \"y.com\")) NIL NIL NIL NIL) ",
        "(\"text\" \"plain\" (\"charset\" \"utf-8\") NIL NIL \"7bit\" 100 5) 12) ",
        "\"report\")"
    )
    .to_string()
}
