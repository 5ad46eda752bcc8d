// Hermes process controller
//
// Owns the Hermes executable for one session and runs the high level relayer
// operations through it. Each call blocks (asynchronously) until Hermes exits.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempPath;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Child;
use tracing::{debug, info, warn};

use crate::command::{Flags, Invocation};
use crate::error::{Error, Result};

pub(crate) mod bundle;

/// Destination for Hermes' standard output
pub type OutputSink = Box<dyn AsyncWrite + Send + Unpin>;

const MNEMONIC_PREFIX: &str = "hermes-key";

/// Bytes of stderr kept for `Error::Process`
const STDERR_TAIL_LIMIT: usize = 64 * 1024;

const SPAWN_ATTEMPTS: u32 = 8;
const SPAWN_BACKOFF: Duration = Duration::from_millis(10);

enum Executable {
    /// Extracted by this handle; deleted on release or drop
    Extracted(TempPath),
    /// Supplied by the caller and left in place
    External(PathBuf),
}

impl Executable {
    fn path(&self) -> &Path {
        match self {
            Executable::Extracted(path) => path,
            Executable::External(path) => path.as_path(),
        }
    }
}

/// Handle on a Hermes executable
pub struct Hermes {
    executable: Executable,
    output: OutputSink,
}

impl Hermes {
    /// Extract the Hermes build embedded with the `bundled` feature
    pub fn acquire() -> Result<Self> {
        let archive = bundle::EMBEDDED
            .ok_or_else(|| Error::extraction("no Hermes archive bundled in this build"))?;
        Self::from_archive(archive)
    }

    /// Extract Hermes from a gzip-compressed tarball
    pub fn from_archive(archive: &[u8]) -> Result<Self> {
        let path = bundle::extract(archive)?;
        info!("Extracted Hermes to {}", path.display());
        Ok(Self {
            executable: Executable::Extracted(path),
            output: Box::new(tokio::io::stdout()),
        })
    }

    /// Use an existing Hermes executable; `release` leaves it on disk
    pub fn from_executable(path: impl Into<PathBuf>) -> Self {
        Self {
            executable: Executable::External(path.into()),
            output: Box::new(tokio::io::stdout()),
        }
    }

    /// Forward Hermes' standard output to `sink` instead of this process's stdout
    pub fn with_output(mut self, sink: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        self.output = Box::new(sink);
        self
    }

    pub fn path(&self) -> &Path {
        self.executable.path()
    }

    /// `hermes keys` with a mnemonic file already on disk
    pub async fn add_key(&mut self, chain_id: &str, key_file: &Path) -> Result<()> {
        self.run(&Invocation::add_key(chain_id, key_file)).await
    }

    /// `hermes keys add` with the mnemonic staged in a temp file.
    ///
    /// The temp file is removed before returning, whether Hermes succeeded or not.
    pub async fn add_mnemonic(&mut self, chain_id: &str, mnemonic: &str) -> Result<()> {
        let mnemonic_file = write_mnemonic(mnemonic)?;

        let outcome = self
            .run(&Invocation::add_mnemonic(chain_id, &mnemonic_file))
            .await;
        let removed = mnemonic_file.close().map_err(Error::Io);

        outcome.and(removed)
    }

    pub async fn create_client(&mut self, host_chain: &str, reference_chain: &str) -> Result<()> {
        self.run(&Invocation::create_client(host_chain, reference_chain)).await
    }

    pub async fn create_connection(&mut self, chain_a: &str, client_a: &str, client_b: &str) -> Result<()> {
        self.run(&Invocation::create_connection(chain_a, client_a, client_b)).await
    }

    pub async fn create_channel(
        &mut self,
        chain_a: &str,
        connection_a: &str,
        port_a: &str,
        port_b: &str,
    ) -> Result<()> {
        self.run(&Invocation::create_channel(chain_a, connection_a, port_a, port_b))
            .await
    }

    pub async fn query_channels(&mut self, show_counterparty: bool, chain: &str) -> Result<()> {
        self.run(&Invocation::query_channels(show_counterparty, chain)).await
    }

    /// Start relaying; returns once Hermes exits
    pub async fn start(&mut self) -> Result<()> {
        self.start_with(Flags::new()).await
    }

    pub async fn start_with(&mut self, flags: Flags) -> Result<()> {
        self.run(&Invocation::start(flags)).await
    }

    /// Run `invocation`, streaming stdout to the sink and keeping the tail of stderr.
    ///
    /// Dropping the returned future kills the Hermes process.
    pub async fn run(&mut self, invocation: &Invocation) -> Result<()> {
        let program = self.path().to_path_buf();
        let argv = invocation.argv(&program);
        debug!("Launching {:?}", argv);

        let mut command = tokio::process::Command::new(&program);
        command
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let mut child = spawn(&mut command).await.map_err(|source| Error::Launch {
            program: program.clone(),
            source,
        })?;

        let (mut stdout, mut stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(stdout), Some(stderr)) => (stdout, stderr),
            _ => {
                return Err(Error::Launch {
                    program,
                    source: io::Error::other("stdio pipes were not captured"),
                })
            }
        };

        let output = &mut self.output;
        let mut tail = StderrTail::new(STDERR_TAIL_LIMIT);
        let streamed = tokio::try_join!(
            async {
                tokio::io::copy(&mut stdout, &mut *output).await?;
                output.flush().await
            },
            tail.fill_from(&mut stderr),
        );
        if let Err(err) = streamed {
            // Nobody drains the pipes any more, so Hermes would eventually block on a write
            let _ = child.start_kill();
            let _ = child.wait().await;
            warn!("hermes {} aborted: {}", invocation, err);
            return Err(err.into());
        }

        let status = child.wait().await?;
        if !status.success() {
            let stderr = tail.into_string();
            warn!("hermes {} failed ({}): {}", invocation, status, stderr);
            return Err(Error::Process {
                exit_code: status.code(),
                stderr,
            });
        }

        info!("hermes {} completed", invocation);
        Ok(())
    }

    /// Delete the extracted executable. Dropping the handle does the same,
    /// ignoring any error.
    pub fn release(self) -> Result<()> {
        match self.executable {
            Executable::Extracted(path) => {
                let location = path.to_path_buf();
                path.close()?;
                debug!("Removed Hermes executable {}", location.display());
            }
            Executable::External(_) => {}
        }
        Ok(())
    }
}

/// Spawn `command`, retrying while the executable is busy.
///
/// A freshly written executable stays busy (ETXTBSY) until every process forked
/// while its write handle was open has called exec. Nothing has run yet when the
/// launch fails this way.
async fn spawn(command: &mut tokio::process::Command) -> io::Result<Child> {
    let mut attempt = 1;
    loop {
        match command.spawn() {
            Err(err) if err.kind() == io::ErrorKind::ExecutableFileBusy && attempt < SPAWN_ATTEMPTS => {
                debug!("Executable busy, launch attempt {}/{}", attempt, SPAWN_ATTEMPTS);
                tokio::time::sleep(SPAWN_BACKOFF * attempt).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// Last `limit` bytes written to Hermes' stderr
struct StderrTail {
    limit: usize,
    bytes: Vec<u8>,
}

impl StderrTail {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            bytes: Vec::new(),
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
        if self.bytes.len() > self.limit {
            let excess = self.bytes.len() - self.limit;
            self.bytes.drain(..excess);
        }
    }

    async fn fill_from<R: AsyncRead + Unpin>(&mut self, reader: &mut R) -> io::Result<()> {
        let mut chunk = [0u8; 8192];
        loop {
            let read = reader.read(&mut chunk).await?;
            if read == 0 {
                return Ok(());
            }
            self.push(&chunk[..read]);
        }
    }

    fn into_string(self) -> String {
        String::from_utf8_lossy(&self.bytes).trim_end().to_string()
    }
}

fn write_mnemonic(mnemonic: &str) -> Result<TempPath> {
    let mut file = tempfile::Builder::new().prefix(MNEMONIC_PREFIX).tempfile()?;
    file.write_all(mnemonic.as_bytes())?;
    file.flush()?;
    Ok(file.into_temp_path())
}
