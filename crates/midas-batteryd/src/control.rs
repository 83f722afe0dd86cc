//! Control socket
//!
//! Line protocol on a unix socket. Every request gets one reply line,
//! `ok [value]` or `err <reason>`.
//!
//! ```text
//! get <property>|usb|ac     set <property> <int>
//! show <attribute>          store <attribute> <value>
//! online <cable>            cable
//! state                     watch
//! ```
//!
//! `watch` turns the connection into a stream of change notices.

use anyhow::{Context, Result};
use midas_battery::SupplyKind;
use midas_hal::{CableType, Property};
use std::fs;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast::error::RecvError;

use crate::publish::Publisher;
use crate::workqueue::{Request, WorkQueue};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Request(Request),
    Watch,
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let verb = words.next().ok_or("empty request")?;
    let args: Vec<&str> = words.collect();

    let request = match (verb, args.as_slice()) {
        ("get", ["usb"]) => Request::SupplyOnline(SupplyKind::Usb),
        ("get", ["ac"]) => Request::SupplyOnline(SupplyKind::Ac),
        ("get", [prop]) => Request::Get(property(prop)?),
        ("set", [prop, value]) => {
            let value = value
                .parse()
                .map_err(|_| format!("invalid value: {}", value))?;
            Request::Set(property(prop)?, value)
        }
        ("show", [attr]) => Request::Show(attr.to_string()),
        ("store", [attr, value]) => Request::Store(attr.to_string(), value.to_string()),
        ("online", [cable]) => Request::Online(
            CableType::parse(cable).ok_or_else(|| format!("unknown cable: {}", cable))?,
        ),
        ("cable", []) => Request::CableEvent,
        ("state", []) => Request::State,
        ("watch", []) => return Ok(Command::Watch),
        _ => return Err(format!("bad request: {}", line.trim())),
    };
    Ok(Command::Request(request))
}

fn property(name: &str) -> Result<Property, String> {
    Property::parse(name).ok_or_else(|| format!("unknown property: {}", name))
}

fn reply_line(reply: Result<String, String>) -> String {
    match reply {
        Ok(value) if value.is_empty() => "ok\n".to_string(),
        Ok(value) => format!("ok {}\n", value),
        Err(reason) => format!("err {}\n", reason),
    }
}

/// Bind the socket, replacing a stale one
pub fn bind(path: &Path) -> Result<UnixListener> {
    if path.exists() {
        fs::remove_file(path)
            .with_context(|| format!("Failed to remove stale socket {}", path.display()))?;
    }
    let listener = UnixListener::bind(path)
        .with_context(|| format!("Failed to bind control socket {}", path.display()))?;
    tracing::info!("Control socket at {}", path.display());
    Ok(listener)
}

pub async fn serve(listener: UnixListener, queue: WorkQueue, publisher: Publisher) {
    loop {
        let stream = match listener.accept().await {
            Ok((stream, _)) => stream,
            Err(e) => {
                tracing::warn!("Accept error: {}", e);
                continue;
            }
        };

        let queue = queue.clone();
        let publisher = publisher.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, queue, publisher).await {
                tracing::debug!("Control client: {}", e);
            }
        });
    }
}

async fn handle_client(stream: UnixStream, queue: WorkQueue, publisher: Publisher) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Ok(Command::Request(request)) => {
                let reply = queue.request(request).await;
                writer.write_all(reply_line(reply).as_bytes()).await?;
            }
            Ok(Command::Watch) => {
                writer.write_all(b"ok\n").await?;
                let mut rx = publisher.subscribe();
                loop {
                    match rx.recv().await {
                        Ok(notice) => {
                            writer.write_all(notice.to_line().as_bytes()).await?;
                            writer.write_all(b"\n").await?;
                        }
                        Err(RecvError::Lagged(missed)) => {
                            tracing::debug!("Watcher missed {} notices", missed);
                        }
                        Err(RecvError::Closed) => return Ok(()),
                    }
                }
            }
            Err(reason) => {
                writer.write_all(reply_line(Err(reason)).as_bytes()).await?;
            }
        }
    }

    Ok(())
}
