use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::error::ConveyorError;

use super::ConveyorSwitch;

/// TP-Link Kasa smart-plug client. The plug speaks length-prefixed,
/// XOR-autokey-obfuscated JSON on TCP port 9999. A fresh connection is
/// opened per command; reused plug sessions go stale and start dropping
/// commands, so none are kept.
#[derive(Debug, Clone)]
pub struct KasaPlug {
    host: String,
    port: u16,
}

const XOR_SEED: u8 = 171;

// Hard cap on a response body; sysinfo replies are well under 4 KiB.
const MAX_RESPONSE_LEN: u32 = 1 << 16;

impl KasaPlug {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    async fn roundtrip(&self, command: &Value) -> Result<Value, ConveyorError> {
        let payload = serde_json::to_vec(command)
            .map_err(|e| ConveyorError::Protocol(e.to_string()))?;

        let mut stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
        let cipher = obfuscate(&payload);
        stream.write_all(&(cipher.len() as u32).to_be_bytes()).await?;
        stream.write_all(&cipher).await?;

        let mut len_buf = [0u8; 4];
        stream.read_exact(&mut len_buf).await?;
        let len = u32::from_be_bytes(len_buf);
        if len == 0 || len > MAX_RESPONSE_LEN {
            return Err(ConveyorError::Protocol(format!(
                "response length {len} out of bounds"
            )));
        }
        let mut body = vec![0u8; len as usize];
        stream.read_exact(&mut body).await?;

        let plain = deobfuscate(&body);
        let response: Value = serde_json::from_slice(&plain)
            .map_err(|e| ConveyorError::Protocol(e.to_string()))?;
        debug!(%response, "Plug response");
        Ok(response)
    }

    async fn set_relay(&self, state: u8) -> Result<(), ConveyorError> {
        let command = json!({"system": {"set_relay_state": {"state": state}}});
        let response = self.roundtrip(&command).await?;
        let err_code = response["system"]["set_relay_state"]["err_code"]
            .as_i64()
            .ok_or_else(|| ConveyorError::Protocol("missing err_code".to_string()))?;
        if err_code != 0 {
            return Err(ConveyorError::Refused(err_code));
        }
        info!(state, "Conveyor relay set");
        Ok(())
    }
}

#[async_trait]
impl ConveyorSwitch for KasaPlug {
    async fn turn_on(&self) -> Result<(), ConveyorError> {
        self.set_relay(1).await
    }

    async fn turn_off(&self) -> Result<(), ConveyorError> {
        self.set_relay(0).await
    }

    async fn is_on(&self) -> Result<bool, ConveyorError> {
        let command = json!({"system": {"get_sysinfo": {}}});
        let response = self.roundtrip(&command).await?;
        let relay_state = response["system"]["get_sysinfo"]["relay_state"]
            .as_i64()
            .ok_or_else(|| ConveyorError::Protocol("missing relay_state".to_string()))?;
        Ok(relay_state == 1)
    }

    fn name(&self) -> &'static str {
        "KasaPlug"
    }
}

/// Kasa autokey XOR: each plaintext byte is XORed with the previous
/// cipher byte, seeded with 171.
fn obfuscate(plain: &[u8]) -> Vec<u8> {
    let mut key = XOR_SEED;
    plain
        .iter()
        .map(|&b| {
            let c = key ^ b;
            key = c;
            c
        })
        .collect()
}

fn deobfuscate(cipher: &[u8]) -> Vec<u8> {
    let mut key = XOR_SEED;
    cipher
        .iter()
        .map(|&c| {
            let p = key ^ c;
            key = c;
            p
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn obfuscation_roundtrips() {
        let payload = br#"{"system":{"set_relay_state":{"state":1}}}"#;
        let cipher = obfuscate(payload);
        assert_ne!(&cipher[..], &payload[..]);
        assert_eq!(deobfuscate(&cipher), payload);
    }

    #[test]
    fn obfuscation_first_byte_uses_seed() {
        let cipher = obfuscate(b"{");
        assert_eq!(cipher[0], XOR_SEED ^ b'{');
    }

    /// Minimal fake plug: answers every command with the given JSON.
    async fn spawn_fake_plug(response: Value) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                let mut len_buf = [0u8; 4];
                if stream.read_exact(&mut len_buf).await.is_err() {
                    continue;
                }
                let len = u32::from_be_bytes(len_buf) as usize;
                let mut body = vec![0u8; len];
                if stream.read_exact(&mut body).await.is_err() {
                    continue;
                }
                let reply = obfuscate(response.to_string().as_bytes());
                let _ = stream.write_all(&(reply.len() as u32).to_be_bytes()).await;
                let _ = stream.write_all(&reply).await;
            }
        });
        addr
    }

    #[tokio::test]
    async fn turn_on_accepts_zero_err_code() {
        let addr =
            spawn_fake_plug(json!({"system": {"set_relay_state": {"err_code": 0}}})).await;
        let plug = KasaPlug::new(addr.ip().to_string(), addr.port());
        plug.turn_on().await.unwrap();
    }

    #[tokio::test]
    async fn nonzero_err_code_is_refused() {
        let addr =
            spawn_fake_plug(json!({"system": {"set_relay_state": {"err_code": -3}}})).await;
        let plug = KasaPlug::new(addr.ip().to_string(), addr.port());
        let err = plug.turn_off().await.unwrap_err();
        assert!(matches!(err, ConveyorError::Refused(-3)));
    }

    #[tokio::test]
    async fn is_on_reads_relay_state() {
        let addr = spawn_fake_plug(json!({"system": {"get_sysinfo": {"relay_state": 1}}})).await;
        let plug = KasaPlug::new(addr.ip().to_string(), addr.port());
        assert!(plug.is_on().await.unwrap());
    }

    #[tokio::test]
    async fn unreachable_plug_is_an_io_error() {
        // port 9 on localhost is essentially never listening
        let plug = KasaPlug::new("127.0.0.1", 9);
        let err = plug.is_on().await.unwrap_err();
        assert!(matches!(err, ConveyorError::Io(_)));
    }
}
