//! In-process stand-in for a sway/i3 IPC socket.
//!
//! Answers `GET_TREE`, `SUBSCRIBE` and `RUN_COMMAND` on a Unix socket in a
//! temporary directory, records every command it runs, and pushes window
//! events to subscribed connections on demand.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Value, json};
use swayfade_lib::ipc::{MessageType, WINDOW_EVENT, encode_frame, read_message};
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;

#[derive(Default)]
struct State {
    tree: Value,
    commands: Vec<String>,
    subscribers: Vec<mpsc::UnboundedSender<Vec<u8>>>,
}

pub struct FakeWm {
    pub path: PathBuf,
    state: Arc<Mutex<State>>,
    _dir: TempDir,
}

impl FakeWm {
    /// Binds the socket and starts serving `tree`.
    pub fn spawn(tree: Value) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wm.sock");
        let listener = UnixListener::bind(&path).unwrap();
        let state = Arc::new(Mutex::new(State {
            tree,
            ..Default::default()
        }));

        let accept_state = state.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, accept_state.clone()));
            }
        });

        Self { path, state, _dir: dir }
    }

    pub fn set_tree(&self, tree: Value) { self.state.lock().tree = tree; }

    pub fn commands(&self) -> Vec<String> { self.state.lock().commands.clone() }

    pub fn clear_commands(&self) { self.state.lock().commands.clear(); }

    /// Opacity values commanded for one window, in order.
    pub fn opacities_for(&self, window: i64) -> Vec<f64> {
        self.commands()
            .iter()
            .filter_map(|command| parse_command(command))
            .filter(|(id, _)| *id == window)
            .map(|(_, opacity)| opacity)
            .collect()
    }

    pub fn last_opacity(&self, window: i64) -> Option<f64> {
        self.opacities_for(window).last().copied()
    }

    pub fn subscriber_count(&self) -> usize { self.state.lock().subscribers.len() }

    /// Sends a window event to every subscribed connection.
    pub fn push_event(&self, change: &str, id: i64, node_type: &str) {
        let payload = json!({
            "change": change,
            "container": { "id": id, "type": node_type, "nodes": [], "floating_nodes": [] },
        });
        let frame = encode_frame(WINDOW_EVENT, payload.to_string().as_bytes());
        self.state.lock().subscribers.retain(|subscriber| subscriber.send(frame.clone()).is_ok());
    }

    /// Closes every event connection, as the window manager does on exit.
    pub fn close_events(&self) { self.state.lock().subscribers.clear(); }

    /// Polls until `predicate` holds, failing the test after two seconds.
    pub async fn wait_until(&self, what: &str, predicate: impl Fn(&Self) -> bool) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while !predicate(self) {
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {what}; commands: {:?}",
                self.commands()
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

/// Parses `[con_id=N] opacity V`.
pub fn parse_command(command: &str) -> Option<(i64, f64)> {
    let rest = command.strip_prefix("[con_id=")?;
    let (id, rest) = rest.split_once("] opacity ")?;
    Some((id.parse().ok()?, rest.parse().ok()?))
}

async fn serve(mut stream: UnixStream, state: Arc<Mutex<State>>) {
    while let Ok(message) = read_message(&mut stream).await {
        let reply = if message.kind == MessageType::GetTree.code() {
            state.lock().tree.to_string()
        } else if message.kind == MessageType::RunCommand.code() {
            let command = String::from_utf8(message.payload).unwrap();
            state.lock().commands.push(command);
            json!([{ "success": true }]).to_string()
        } else if message.kind == MessageType::Subscribe.code() {
            let (sender, mut receiver) = mpsc::unbounded_channel();
            state.lock().subscribers.push(sender);
            let reply = encode_frame(message.kind, br#"{"success":true}"#);
            if stream.write_all(&reply).await.is_err() {
                return;
            }
            while let Some(frame) = receiver.recv().await {
                if stream.write_all(&frame).await.is_err() {
                    return;
                }
            }
            return;
        } else {
            json!({ "success": false }).to_string()
        };

        if stream.write_all(&encode_frame(message.kind, reply.as_bytes())).await.is_err() {
            return;
        }
    }
}

/// A workspace holding two tiled windows and one floating window.
///
/// Window 1 is focused.
pub fn sample_tree() -> Value {
    json!({
        "id": 1, "type": "root", "focused": false,
        "nodes": [{
            "id": 2, "type": "output", "name": "eDP-1",
            "nodes": [{
                "id": 3, "type": "workspace", "name": "1",
                "nodes": [
                    { "id": 10, "type": "con", "focused": true, "nodes": [] },
                    { "id": 11, "type": "con", "focused": false, "nodes": [] }
                ],
                "floating_nodes": [
                    { "id": 12, "type": "floating_con", "focused": false, "nodes": [] }
                ]
            }]
        }]
    })
}
