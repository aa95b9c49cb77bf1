//! Subprocess translation backend.
//!
//! Spawns an external command and talks JSON lines over its stdin/stdout:
//! the bridge announces `{"type":"ready"}`, then answers each
//! `{"type":"translate",...}` request with a `result` or `error` message
//! carrying the same id. `{"type":"shutdown"}` asks it to exit.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use doccapture_shared::{CaptureError, Result};

use crate::Translator;

// ---------------------------------------------------------------------------
// Protocol types
// ---------------------------------------------------------------------------

/// Request message sent to the bridge.
#[derive(Debug, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RequestMessage<'a> {
    Translate {
        id: String,
        text: &'a str,
        target_locale: &'a str,
    },
    Shutdown,
}

/// Response message received from the bridge.
#[derive(Debug, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseMessage {
    Ready,
    Result { id: String, text: String },
    Error { id: String, error: String },
}

// ---------------------------------------------------------------------------
// Bridge handle
// ---------------------------------------------------------------------------

struct BridgeHandle {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    request_counter: u64,
}

impl BridgeHandle {
    async fn read_message(&mut self) -> Result<ResponseMessage> {
        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .await
            .map_err(|e| bridge_err(format!("bridge read error: {e}")))?;
        if read == 0 {
            return Err(bridge_err("bridge closed stdout unexpectedly"));
        }

        serde_json::from_str(line.trim()).map_err(|e| {
            bridge_err(format!(
                "invalid bridge message: {e} (got: {})",
                truncate(line.trim(), 200)
            ))
        })
    }

    async fn send(&mut self, message: &RequestMessage<'_>) -> Result<()> {
        let json = serde_json::to_string(message)
            .map_err(|e| bridge_err(format!("failed to serialize request: {e}")))?;

        self.stdin
            .write_all(format!("{json}\n").as_bytes())
            .await
            .map_err(|e| bridge_err(format!("failed to write to bridge stdin: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| bridge_err(format!("failed to flush bridge stdin: {e}")))
    }

    async fn request(&mut self, text: &str, target_locale: &str) -> Result<String> {
        self.request_counter += 1;
        let id = format!("req-{}", self.request_counter);

        self.send(&RequestMessage::Translate {
            id: id.clone(),
            text,
            target_locale,
        })
        .await?;

        // Replies to requests abandoned by a caller timeout may still be in
        // the pipe; skip anything not addressed to this id.
        loop {
            match self.read_message().await? {
                ResponseMessage::Result { id: resp_id, text } if resp_id == id => return Ok(text),
                ResponseMessage::Error { id: resp_id, error } if resp_id == id => {
                    return Err(bridge_err(error));
                }
                ResponseMessage::Ready => {
                    return Err(bridge_err("unexpected ready message during translation"));
                }
                ResponseMessage::Result { id: stale, .. } | ResponseMessage::Error { id: stale, .. } => {
                    debug!(%stale, expected = %id, "discarding stale bridge reply");
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Translator
// ---------------------------------------------------------------------------

/// Translator backed by an external bridge process.
pub struct BridgeTranslator {
    handle: Mutex<Option<BridgeHandle>>,
    target_locale: String,
}

impl BridgeTranslator {
    /// Spawn `cmd args...` and wait for its ready handshake.
    #[instrument(skip(args), fields(arg_count = args.len()))]
    pub async fn spawn(cmd: &str, args: &[String], target_locale: &str) -> Result<Self> {
        info!("spawning translation bridge");

        let mut child = Command::new(cmd)
            .args(args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| bridge_err(format!("failed to spawn bridge: {e}. Is `{cmd}` installed?")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| bridge_err("failed to capture bridge stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| bridge_err("failed to capture bridge stdout"))?;

        let mut handle = BridgeHandle {
            child,
            stdin,
            reader: BufReader::new(stdout),
            request_counter: 0,
        };

        match handle.read_message().await? {
            ResponseMessage::Ready => info!("bridge is ready"),
            other => {
                return Err(bridge_err(format!("expected ready message, got: {other:?}")));
            }
        }

        Ok(Self {
            handle: Mutex::new(Some(handle)),
            target_locale: target_locale.to_string(),
        })
    }
}

#[async_trait]
impl Translator for BridgeTranslator {
    fn name(&self) -> &str {
        "bridge"
    }

    async fn translate(&self, text: &str) -> Result<String> {
        let mut guard = self.handle.lock().await;
        let handle = guard
            .as_mut()
            .ok_or_else(|| bridge_err("bridge already shut down"))?;
        handle.request(text, &self.target_locale).await
    }

    async fn shutdown(&self) -> Result<()> {
        let Some(mut handle) = self.handle.lock().await.take() else {
            return Ok(());
        };

        if let Err(e) = handle.send(&RequestMessage::Shutdown).await {
            warn!(error = %e, "failed to send shutdown to bridge");
        }
        drop(handle.stdin);

        match handle.child.wait().await {
            Ok(status) => info!(?status, "bridge exited"),
            Err(e) => warn!("bridge wait error: {e}"),
        }
        Ok(())
    }
}

fn bridge_err(msg: impl Into<String>) -> CaptureError {
    CaptureError::TranslationFailed(msg.into())
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_request_serializes() {
        let msg = RequestMessage::Translate {
            id: "req-1".into(),
            text: "Hello",
            target_locale: "zh",
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(
            json,
            r#"{"type":"translate","id":"req-1","text":"Hello","target_locale":"zh"}"#
        );
    }

    #[test]
    fn shutdown_serializes() {
        let json = serde_json::to_string(&RequestMessage::Shutdown).unwrap();
        assert_eq!(json, r#"{"type":"shutdown"}"#);
    }

    #[test]
    fn responses_deserialize() {
        let ready: ResponseMessage = serde_json::from_str(r#"{"type":"ready"}"#).unwrap();
        assert!(matches!(ready, ResponseMessage::Ready));

        let result: ResponseMessage =
            serde_json::from_str(r#"{"type":"result","id":"req-1","text":"你好"}"#).unwrap();
        assert!(matches!(result, ResponseMessage::Result { ref text, .. } if text == "你好"));

        let error: ResponseMessage =
            serde_json::from_str(r#"{"type":"error","id":"req-2","error":"rate limited"}"#).unwrap();
        assert!(matches!(error, ResponseMessage::Error { ref error, .. } if error == "rate limited"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("你好世界", 2), "你好");
        assert_eq!(truncate("short", 10), "short");
    }

    /// Shell bridge that echoes each request's id back with a fixed text,
    /// failing requests whose text contains `FAIL`.
    #[cfg(unix)]
    const FAKE_BRIDGE: &str = r#"
echo '{"type":"ready"}'
while IFS= read -r line; do
  case "$line" in
    *'"type":"shutdown"'*) exit 0 ;;
  esac
  id=$(printf '%s' "$line" | sed -n 's/.*"id":"\([^"]*\)".*/\1/p')
  case "$line" in
    *FAIL*) printf '{"type":"error","id":"%s","error":"refused"}\n' "$id" ;;
    *) printf '{"type":"result","id":"%s","text":"translated"}\n' "$id" ;;
  esac
done
"#;

    #[cfg(unix)]
    async fn fake_bridge() -> BridgeTranslator {
        BridgeTranslator::spawn("sh", &["-c".to_string(), FAKE_BRIDGE.to_string()], "zh")
            .await
            .unwrap()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn bridge_round_trip() {
        let bridge = fake_bridge().await;
        assert_eq!(bridge.translate("Hello").await.unwrap(), "translated");
        assert_eq!(bridge.translate("World").await.unwrap(), "translated");
        bridge.shutdown().await.unwrap();
        assert!(bridge.translate("late").await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn bridge_error_reply_is_translation_failure() {
        let bridge = fake_bridge().await;
        let err = bridge.translate("please FAIL").await.unwrap_err();
        assert!(matches!(err, CaptureError::TranslationFailed(ref m) if m == "refused"));
        // The bridge stays usable after a refused request.
        assert_eq!(bridge.translate("ok").await.unwrap(), "translated");
        bridge.shutdown().await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_handshake_fails_spawn() {
        let result =
            BridgeTranslator::spawn("sh", &["-c".to_string(), "echo nope".to_string()], "zh").await;
        assert!(matches!(result, Err(CaptureError::TranslationFailed(_))));
    }

    #[tokio::test]
    async fn missing_command_fails_spawn() {
        let result = BridgeTranslator::spawn("doccapture-no-such-bridge", &[], "zh").await;
        assert!(result.is_err());
    }
}
