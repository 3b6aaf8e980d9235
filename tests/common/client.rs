//! Test line client.
//!
//! Logs in, sends lines and asserts on the lines the server sends back.

use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

/// A test chat client.
pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
    name: String,
}

impl TestClient {
    /// Open a connection without logging in.
    pub async fn connect(address: &str, name: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(address).await?;

        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
            name: name.to_string(),
        })
    }

    /// Connect, log in as `name` and consume the welcome burst.
    pub async fn login(address: &str, name: &str) -> anyhow::Result<Self> {
        let mut client = Self::connect(address, name).await?;
        client.send(name).await?;

        let welcome = client.recv().await?;
        if welcome != format!("WELCOME {}", name) {
            anyhow::bail!("Login as {} failed: {}", name, welcome);
        }
        // MOTD
        client.recv().await?;
        Ok(client)
    }

    /// Name this client logged in with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Send one line.
    pub async fn send(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Receive a single line from the server.
    pub async fn recv(&mut self) -> anyhow::Result<String> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    /// Receive a line with a timeout.
    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<String> {
        let mut line = String::new();
        let read = timeout(dur, self.reader.read_line(&mut line)).await??;
        if read == 0 {
            anyhow::bail!("Connection closed by server");
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Receive `count` lines.
    pub async fn recv_lines(&mut self, count: usize) -> anyhow::Result<Vec<String>> {
        let mut lines = Vec::with_capacity(count);
        for _ in 0..count {
            lines.push(self.recv().await?);
        }
        Ok(lines)
    }

    /// Send a command and collect its reply lines.
    pub async fn command(&mut self, line: &str, replies: usize) -> anyhow::Result<Vec<String>> {
        self.send(line).await?;
        self.recv_lines(replies).await
    }

    /// Block until every line sent so far has been processed by the server.
    ///
    /// Lines from one connection are handled in order, so the reply to a
    /// cheap command marks the point where earlier lines are done.
    pub async fn sync(&mut self) -> anyhow::Result<()> {
        self.send("/ignore help").await?;
        loop {
            if self.recv().await? == "==============" {
                return Ok(());
            }
        }
    }

    /// Assert the server sends nothing for a short while.
    pub async fn expect_silence(&mut self) -> anyhow::Result<()> {
        match self.recv_timeout(Duration::from_millis(200)).await {
            Ok(line) => anyhow::bail!("{} unexpectedly received: {}", self.name, line),
            Err(_) => Ok(()),
        }
    }
}
