//! Email controllers and the email queue.
//!
//! An [`Email`] carries its message in an [`EmailState`] and knows how to
//! deliver it; the transport is up to the implementation. [`send`] checks
//! the message before delivering it. [`queue`] parks it in an
//! [`EmailQueue`] for an [`EmailQueueManager`] to send later.
//!
//! ```toml
//! [email]
//! default_from = "Kiln <noreply@example.test>"
//! log = true
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::container::Container;
use crate::error::{Error, Result};
use crate::factory::{Configurable, Factory};

// ── Mailbox ───────────────────────────────────────────────────────────────────

/// An address with an optional display name: `Ada <ada@example.test>`.
///
/// Deserializes from that string form or from `{ email, name }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MailboxFields", into = "String")]
pub struct Mailbox {
    name: Option<String>,
    email: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MailboxFields {
    Text(String),
    Parts {
        email: String,
        #[serde(default)]
        name: Option<String>,
    },
}

impl Mailbox {
    pub fn new(email: impl Into<String>, name: Option<String>) -> Result<Self> {
        let email = email.into().trim().to_owned();
        let forbidden = |c: char| c.is_whitespace() || c.is_control() || "<>,;\"".contains(c);
        let valid = match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.is_empty()
                    && !domain.contains('@')
                    && !email.contains(forbidden)
            }
            None => false,
        };
        if !valid {
            return Err(Error::invalid_configuration(format!("invalid email address {email:?}")));
        }

        let name = name.map(|n| n.trim().to_owned()).filter(|n| !n.is_empty());
        if name.as_deref().is_some_and(|n| n.chars().any(char::is_control)) {
            return Err(Error::invalid_configuration(format!("invalid display name for `{email}`")));
        }
        Ok(Self { name, email })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// One mailbox from a string or object, or a list of them from an array.
    fn list_from_value(key: &str, value: &Value) -> Result<Vec<Self>> {
        let parse = |v: &Value| {
            serde_json::from_value::<Self>(v.clone())
                .map_err(|e| Error::invalid_configuration(format!("`{key}`: {e}")))
        };
        match value {
            Value::Array(items) => items.iter().map(parse).collect(),
            other => parse(other).map(|m| vec![m]),
        }
    }
}

impl FromStr for Mailbox {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match (s.rfind('<'), s.strip_suffix('>')) {
            (Some(open), Some(rest)) => {
                let name = s[..open].trim();
                let name = name
                    .strip_prefix('"')
                    .and_then(|n| n.strip_suffix('"'))
                    .map(|n| n.replace("\\\"", "\"").replace("\\\\", "\\"))
                    .unwrap_or_else(|| name.to_owned());
                Self::new(&rest[open + 1..], Some(name))
            }
            _ => Self::new(s, None),
        }
    }
}

impl TryFrom<MailboxFields> for Mailbox {
    type Error = Error;

    fn try_from(fields: MailboxFields) -> Result<Self> {
        match fields {
            MailboxFields::Text(text) => text.parse(),
            MailboxFields::Parts { email, name } => Self::new(email, name),
        }
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            None => f.write_str(&self.email),
            Some(name) if name.contains(|c: char| ",;:<>@()\"\\".contains(c)) => {
                let quoted = name.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "\"{quoted}\" <{}>", self.email)
            }
            Some(name) => write!(f, "{name} <{}>", self.email),
        }
    }
}

impl From<Mailbox> for String {
    fn from(mailbox: Mailbox) -> Self {
        mailbox.to_string()
    }
}

/// A file sent along with the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub path: String,
    /// File name shown to the recipient; the path's file name when unset.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl Attachment {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), name: None, content_type: None }
    }

    fn list_from_value(value: &Value) -> Result<Vec<Self>> {
        let parse = |v: &Value| match v {
            Value::String(path) => Ok(Self::new(path.as_str())),
            other => serde_json::from_value(other.clone())
                .map_err(|e| Error::invalid_configuration(format!("`attachments`: {e}"))),
        };
        match value {
            Value::Array(items) => items.iter().map(parse).collect(),
            other => parse(other).map(|a| vec![a]),
        }
    }
}

// ── Configuration ─────────────────────────────────────────────────────────────

/// Defaults applied to every email the email factory builds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub default_from: Option<String>,
    pub default_reply_to: Option<String>,
    /// Log every sent or queued email at info level.
    pub log: bool,
    pub track: bool,
}

impl EmailConfig {
    pub fn validate(&self) -> Result<()> {
        for address in [&self.default_from, &self.default_reply_to].into_iter().flatten() {
            address.parse::<Mailbox>()?;
        }
        Ok(())
    }
}

// ── EmailState ────────────────────────────────────────────────────────────────

/// The message of an email controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailState {
    campaign: Option<String>,
    to: Vec<Mailbox>,
    cc: Vec<Mailbox>,
    bcc: Vec<Mailbox>,
    from: Option<Mailbox>,
    reply_to: Option<Mailbox>,
    subject: String,
    msg_html: Option<String>,
    msg_txt: Option<String>,
    attachments: Vec<Attachment>,
    log: bool,
    track: bool,
}

impl EmailState {
    pub fn campaign(&self) -> Option<&str> {
        self.campaign.as_deref()
    }

    pub fn set_campaign(&mut self, campaign: impl Into<String>) -> &mut Self {
        self.campaign = Some(campaign.into());
        self
    }

    pub fn to(&self) -> &[Mailbox] {
        &self.to
    }

    pub fn set_to(&mut self, to: Vec<Mailbox>) -> &mut Self {
        self.to = to;
        self
    }

    pub fn add_to(&mut self, to: Mailbox) -> &mut Self {
        self.to.push(to);
        self
    }

    pub fn cc(&self) -> &[Mailbox] {
        &self.cc
    }

    pub fn set_cc(&mut self, cc: Vec<Mailbox>) -> &mut Self {
        self.cc = cc;
        self
    }

    pub fn add_cc(&mut self, cc: Mailbox) -> &mut Self {
        self.cc.push(cc);
        self
    }

    pub fn bcc(&self) -> &[Mailbox] {
        &self.bcc
    }

    pub fn set_bcc(&mut self, bcc: Vec<Mailbox>) -> &mut Self {
        self.bcc = bcc;
        self
    }

    pub fn add_bcc(&mut self, bcc: Mailbox) -> &mut Self {
        self.bcc.push(bcc);
        self
    }

    pub fn from(&self) -> Option<&Mailbox> {
        self.from.as_ref()
    }

    pub fn set_from(&mut self, from: Mailbox) -> &mut Self {
        self.from = Some(from);
        self
    }

    pub fn reply_to(&self) -> Option<&Mailbox> {
        self.reply_to.as_ref()
    }

    pub fn set_reply_to(&mut self, reply_to: Mailbox) -> &mut Self {
        self.reply_to = Some(reply_to);
        self
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) -> &mut Self {
        self.subject = subject.into();
        self
    }

    pub fn msg_html(&self) -> Option<&str> {
        self.msg_html.as_deref()
    }

    pub fn set_msg_html(&mut self, html: impl Into<String>) -> &mut Self {
        self.msg_html = Some(html.into());
        self
    }

    pub fn msg_txt(&self) -> Option<&str> {
        self.msg_txt.as_deref()
    }

    pub fn set_msg_txt(&mut self, text: impl Into<String>) -> &mut Self {
        self.msg_txt = Some(text.into());
        self
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn set_attachments(&mut self, attachments: Vec<Attachment>) -> &mut Self {
        self.attachments = attachments;
        self
    }

    pub fn add_attachment(&mut self, attachment: Attachment) -> &mut Self {
        self.attachments.push(attachment);
        self
    }

    pub fn log(&self) -> bool {
        self.log
    }

    pub fn set_log(&mut self, log: bool) -> &mut Self {
        self.log = log;
        self
    }

    pub fn track(&self) -> bool {
        self.track
    }

    pub fn set_track(&mut self, track: bool) -> &mut Self {
        self.track = track;
        self
    }

    /// Every recipient: to, then cc, then bcc.
    pub fn recipients(&self) -> impl Iterator<Item = &Mailbox> {
        self.to.iter().chain(&self.cc).chain(&self.bcc)
    }

    /// Fills the sender, reply-to and flags from the email configuration.
    pub fn apply_defaults(&mut self, config: &EmailConfig) -> Result<()> {
        if let (None, Some(from)) = (&self.from, &config.default_from) {
            self.from = Some(from.parse()?);
        }
        if let (None, Some(reply_to)) = (&self.reply_to, &config.default_reply_to) {
            self.reply_to = Some(reply_to.parse()?);
        }
        self.log = config.log;
        self.track = config.track;
        Ok(())
    }

    /// Fails unless the message has a sender, a recipient and a body.
    pub fn check(&self) -> Result<()> {
        if self.from.is_none() {
            return Err(Error::invalid_configuration("email has no sender"));
        }
        if self.recipients().next().is_none() {
            return Err(Error::invalid_configuration("email has no recipients"));
        }
        if self.msg_html.is_none() && self.msg_txt.is_none() {
            return Err(Error::invalid_configuration("email has no body"));
        }
        Ok(())
    }

    /// Applies one message field; other keys are left to the concrete email.
    pub fn set_field(&mut self, key: &str, value: &Value) -> Result<bool> {
        match key {
            "campaign" => {
                self.set_campaign(expect_str(key, value)?);
            }
            "to" => self.to = Mailbox::list_from_value(key, value)?,
            "cc" => self.cc = Mailbox::list_from_value(key, value)?,
            "bcc" => self.bcc = Mailbox::list_from_value(key, value)?,
            "from" | "reply_to" => {
                let mailbox = serde_json::from_value::<Mailbox>(value.clone())
                    .map_err(|e| Error::invalid_configuration(format!("`{key}`: {e}")))?;
                if key == "from" {
                    self.set_from(mailbox);
                } else {
                    self.set_reply_to(mailbox);
                }
            }
            "subject" => {
                self.set_subject(expect_str(key, value)?);
            }
            "msg_html" => {
                self.set_msg_html(expect_str(key, value)?);
            }
            "msg_txt" => {
                self.set_msg_txt(expect_str(key, value)?);
            }
            "attachments" => self.attachments = Attachment::list_from_value(value)?,
            "log" => {
                self.set_log(expect_bool(key, value)?);
            }
            "track" => {
                self.set_track(expect_bool(key, value)?);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

fn expect_str<'a>(key: &str, value: &'a Value) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| Error::invalid_configuration(format!("`{key}` must be a string")))
}

fn expect_bool(key: &str, value: &Value) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| Error::invalid_configuration(format!("`{key}` must be a boolean")))
}

// ── Email ─────────────────────────────────────────────────────────────────────

/// An email controller.
pub trait Email: Configurable + Send {
    /// Second-phase injection, called once by the email factory. The
    /// default applies the `[email]` configuration.
    fn set_dependencies(&mut self, container: &Container) -> Result<()> {
        self.state_mut().apply_defaults(&container.config().email)
    }

    fn state(&self) -> &EmailState;

    fn state_mut(&mut self) -> &mut EmailState;

    /// Hands the message to a transport.
    fn deliver(&mut self) -> Result<()>;
}

/// Checks the message and delivers it.
pub fn send(email: &mut dyn Email) -> Result<()> {
    email.state().check()?;
    email.deliver()?;

    let state = email.state();
    let recipients = state.recipients().count();
    if state.log() {
        info!(campaign = state.campaign(), subject = %state.subject(), recipients, "email sent");
    } else {
        debug!(recipients, "email sent");
    }
    Ok(())
}

/// Checks the message and parks it in `queue`. `controller` is the email
/// identifier used to rebuild it when the queue is processed.
pub fn queue(email: &dyn Email, controller: &str, queue: &dyn EmailQueue) -> Result<()> {
    let state = email.state();
    state.check()?;
    queue.push(EmailQueueItem { controller: controller.to_owned(), message: state.clone() })?;

    if state.log() {
        info!(controller, campaign = state.campaign(), subject = %state.subject(), "email queued");
    } else {
        debug!(controller, "email queued");
    }
    Ok(())
}

// ── Queue ─────────────────────────────────────────────────────────────────────

/// One parked email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailQueueItem {
    pub controller: String,
    pub message: EmailState,
}

/// Storage for emails waiting to be sent.
pub trait EmailQueue: Send + Sync {
    fn push(&self, item: EmailQueueItem) -> Result<()>;

    /// The oldest item, if any.
    fn pop(&self) -> Result<Option<EmailQueueItem>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process FIFO queue.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    items: Mutex<VecDeque<EmailQueueItem>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EmailQueue for MemoryQueue {
    fn push(&self, item: EmailQueueItem) -> Result<()> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).push_back(item);
        Ok(())
    }

    fn pop(&self) -> Result<Option<EmailQueueItem>> {
        Ok(self.items.lock().unwrap_or_else(PoisonError::into_inner).pop_front())
    }

    fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Outcome of one queue run.
#[derive(Debug, Default)]
pub struct QueueReport {
    pub sent: usize,
    /// Items that could not be rebuilt or sent, for the caller to retry or
    /// discard.
    pub failed: Vec<(EmailQueueItem, Error)>,
}

/// Drains a queue, rebuilding each email through the email factory.
pub struct EmailQueueManager {
    emails: Arc<Factory<dyn Email>>,
    queue: Arc<dyn EmailQueue>,
}

impl EmailQueueManager {
    pub fn new(emails: Arc<Factory<dyn Email>>, queue: Arc<dyn EmailQueue>) -> Self {
        Self { emails, queue }
    }

    pub fn queue(&self) -> &Arc<dyn EmailQueue> {
        &self.queue
    }

    /// Sends everything currently queued.
    pub fn process(&self) -> Result<QueueReport> {
        let mut report = QueueReport::default();
        while let Some(item) = self.queue.pop()? {
            match self.send_item(&item) {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    warn!(controller = %item.controller, error = %e, "queued email failed");
                    report.failed.push((item, e));
                }
            }
        }
        info!(sent = report.sent, failed = report.failed.len(), "email queue processed");
        Ok(report)
    }

    fn send_item(&self, item: &EmailQueueItem) -> Result<()> {
        let mut email = self.emails.create(&item.controller, None)?;
        *email.state_mut() = item.message.clone();
        send(email.as_mut())
    }
}
