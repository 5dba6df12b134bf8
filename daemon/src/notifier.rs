//! System notification sender

use crate::config::NotificationMethod;
use crate::error::NotificationError;
use async_trait::async_trait;
use notify_rust::Notification;
use std::io;
use tokio::process::Command;
use tracing::debug;

/// Delivery may block on the host; callers bound it with a timeout.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, title: &str, body: &str) -> Result<(), NotificationError>;
}

/// Native notification through `notify-rust`.
#[derive(Debug, Default)]
pub struct DesktopNotifier;

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn notify(&self, title: &str, body: &str) -> Result<(), NotificationError> {
        let (title, body) = (title.to_string(), body.to_string());
        // show() is a blocking D-Bus round trip
        tokio::task::spawn_blocking(move || {
            Notification::new()
                .summary(&title)
                .body(&body)
                .appname("cpu-shield")
                .show()
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| NotificationError::Desktop(e.to_string()))?
        .map_err(NotificationError::Desktop)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Linux,
    MacOs,
    Windows,
    Other,
}

impl OsFamily {
    pub fn current() -> Self {
        if cfg!(target_os = "linux") {
            OsFamily::Linux
        } else if cfg!(target_os = "macos") {
            OsFamily::MacOs
        } else if cfg!(target_os = "windows") {
            OsFamily::Windows
        } else {
            OsFamily::Other
        }
    }
}

/// Notification through the platform's command-line tool.
#[derive(Debug, Clone, Copy)]
pub struct CommandNotifier {
    family: OsFamily,
}

impl CommandNotifier {
    pub fn new(family: OsFamily) -> Self {
        Self { family }
    }

    /// Program and arguments for this family, `None` where no tool exists.
    pub fn command_line(&self, title: &str, body: &str) -> Option<(&'static str, Vec<String>)> {
        match self.family {
            OsFamily::Linux => Some(("notify-send", vec![title.to_string(), body.to_string()])),
            OsFamily::MacOs => {
                let script = format!(
                    "display notification \"{}\" with title \"{}\"",
                    applescript_escape(body),
                    applescript_escape(title)
                );
                Some(("osascript", vec!["-e".to_string(), script]))
            }
            OsFamily::Windows => {
                let script = format!(
                    "[Windows.UI.Notifications.ToastNotificationManager, Windows.UI.Notifications, ContentType = WindowsRuntime] > $null; \
                     $template = [Windows.UI.Notifications.ToastNotificationManager]::GetTemplateContent([Windows.UI.Notifications.ToastTemplateType]::ToastText02); \
                     $textNodes = $template.GetElementsByTagName('text'); \
                     $textNodes.Item(0).AppendChild($template.CreateTextNode('{}')) > $null; \
                     $textNodes.Item(1).AppendChild($template.CreateTextNode('{}')) > $null; \
                     $toast = [Windows.UI.Notifications.ToastNotification]::new($template); \
                     [Windows.UI.Notifications.ToastNotificationManager]::CreateToastNotifier('cpu-shield').Show($toast);",
                    title.replace('\'', "''"),
                    body.replace('\'', "''")
                );
                Some(("powershell", vec!["-Command".to_string(), script]))
            }
            OsFamily::Other => None,
        }
    }
}

fn applescript_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[async_trait]
impl Notifier for CommandNotifier {
    async fn notify(&self, title: &str, body: &str) -> Result<(), NotificationError> {
        let Some((program, args)) = self.command_line(title, body) else {
            debug!("No notification mechanism for {:?}", self.family);
            return Ok(());
        };
        let status = match Command::new(program).args(&args).kill_on_drop(true).status().await {
            Ok(status) => status,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{} not installed, notification skipped", program);
                return Ok(());
            }
            Err(source) => return Err(NotificationError::Spawn { program, source }),
        };
        if status.success() {
            Ok(())
        } else {
            Err(NotificationError::Exit { program, status })
        }
    }
}

#[derive(Debug, Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, _title: &str, _body: &str) -> Result<(), NotificationError> {
        Ok(())
    }
}

/// Pick the notifier once at startup.
pub fn select_notifier(method: NotificationMethod) -> Box<dyn Notifier> {
    match method {
        NotificationMethod::Desktop => Box::new(DesktopNotifier),
        NotificationMethod::Command => Box::new(CommandNotifier::new(OsFamily::current())),
        NotificationMethod::None => Box::new(NullNotifier),
    }
}
