//! Command shell: one device-node operation per input line.
//!
//! ```text
//! list                      registered nodes
//! read <node> [max_len]     one read from a fresh descriptor
//! cat <node>                read until end of stream
//! write <node> <payload>    write `<payload>\n`
//! help | quit
//! ```
//!
//! `<node>` is a node path or a name relative to the device root. Every
//! command opens and releases its own descriptor. Commands run one at a
//! time, so a command never waits on a device lock held by another.

use std::error::Error as _;
use std::io;
use std::str::FromStr;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use smarthome_adapter_devnode::{Fd, FileTable, NodeError};
use smarthome_app::interrupt::Interrupt;
use smarthome_app::ports::DriftSource;
use smarthome_domain::codec::MAX_STATE_LEN;

/// Default `max_len` for `read`.
const DEFAULT_READ_LEN: usize = 64;

/// Buffer size `cat` reads with.
const CAT_CHUNK: usize = 64;

const HELP: &str = "\
list                      list device nodes
read <node> [max_len]     read once from a node
cat <node>                read a node until end of stream
write <node> <payload>    write a command (on, off, 1, 0)
help                      show this help
quit                      exit";

/// A parsed shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Read { node: String, max_len: usize },
    Cat { node: String },
    Write { node: String, payload: String },
    Help,
    Quit,
}

/// Shell input that is not a command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown command {0:?}, try `help`")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();
        match (name, args.as_slice()) {
            ("list" | "ls", []) => Ok(Self::List),
            ("help", []) => Ok(Self::Help),
            ("quit" | "exit", []) => Ok(Self::Quit),
            ("read", [node]) => Ok(Self::Read {
                node: (*node).to_string(),
                max_len: DEFAULT_READ_LEN,
            }),
            ("read", [node, max_len]) => {
                let max_len = max_len
                    .parse()
                    .map_err(|_| ParseError::Usage("read <node> [max_len]"))?;
                Ok(Self::Read {
                    node: (*node).to_string(),
                    max_len,
                })
            }
            ("read", _) => Err(ParseError::Usage("read <node> [max_len]")),
            ("cat", [node]) => Ok(Self::Cat {
                node: (*node).to_string(),
            }),
            ("cat", _) => Err(ParseError::Usage("cat <node>")),
            ("write", [node, payload]) => Ok(Self::Write {
                node: (*node).to_string(),
                payload: (*payload).to_string(),
            }),
            ("write", _) => Err(ParseError::Usage("write <node> <payload>")),
            ("list" | "ls", _) => Err(ParseError::Usage("list")),
            (other, _) => Err(ParseError::Unknown(other.to_string())),
        }
    }
}

/// Executes shell commands against the device nodes.
pub struct Shell<S> {
    files: FileTable<S>,
}

impl<S: DriftSource> Shell<S> {
    pub fn new(files: FileTable<S>) -> Self {
        Self { files }
    }

    /// Run commands from `input` until `quit` or end of input.
    ///
    /// Blank lines and lines starting with `#` are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error when reading `input` or writing `out` fails. Device
    /// errors are reported on `out` and do not stop the shell.
    pub async fn run<R, W>(&self, input: R, out: &mut W) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: io::Write,
    {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.parse::<Command>() {
                Ok(Command::Quit) => break,
                Ok(command) => self.execute(command, out).await?,
                Err(err) => writeln!(out, "error: {err}")?,
            }
            out.flush()?;
        }
        Ok(())
    }

    /// Execute one command, writing its result to `out`.
    ///
    /// # Errors
    ///
    /// Returns an error only when writing `out` fails.
    pub async fn execute<W: io::Write>(&self, command: Command, out: &mut W) -> io::Result<()> {
        let result = match command {
            Command::List => Ok(self.list()),
            Command::Help => Ok(HELP.to_string()),
            Command::Quit => Ok(String::new()),
            Command::Read { node, max_len } => self.read(&node, max_len).await,
            Command::Cat { node } => self.cat(&node).await,
            Command::Write { node, payload } => self.write(&node, &payload).await,
        };
        match result {
            Ok(text) => writeln!(out, "{text}"),
            Err(err) => writeln!(out, "error: {} (errno {})", describe(&err), err.errno()),
        }
    }

    fn list(&self) -> String {
        self.files
            .nodes()
            .iter()
            .map(|node| {
                let mode = if node.kind.is_writable() { "rw" } else { "r-" };
                format!(
                    "{}\t{mode}\t{}\t{}",
                    node.minor,
                    node.kind,
                    node.path.display()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    async fn read(&self, node: &str, max_len: usize) -> Result<String, NodeError> {
        let fd = self.files.open(node)?;
        let max_len = max_len.min(MAX_STATE_LEN);
        let mut buf = [0u8; MAX_STATE_LEN];
        let result = self
            .files
            .read(fd, &mut buf[..], max_len, &Interrupt::never())
            .await;
        self.files.release(fd).await?;
        let copied = result?;
        Ok(String::from_utf8_lossy(&buf[..copied]).into_owned())
    }

    async fn cat(&self, node: &str) -> Result<String, NodeError> {
        let fd = self.files.open(node)?;
        let result = self.read_to_end(fd).await;
        self.files.release(fd).await?;
        let bytes = result?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn read_to_end(&self, fd: Fd) -> Result<Vec<u8>, NodeError> {
        let token = Interrupt::never();
        let mut bytes = Vec::new();
        let mut chunk = [0u8; CAT_CHUNK];
        loop {
            let copied = self.files.read(fd, &mut chunk[..], CAT_CHUNK, &token).await?;
            if copied == 0 {
                return Ok(bytes);
            }
            bytes.extend_from_slice(&chunk[..copied]);
        }
    }

    async fn write(&self, node: &str, payload: &str) -> Result<String, NodeError> {
        let fd = self.files.open(node)?;
        let payload = format!("{payload}\n").into_bytes();
        let result = self
            .files
            .write(fd, &payload[..], payload.len(), &Interrupt::never())
            .await;
        self.files.release(fd).await?;
        let accepted = result?;
        Ok(format!("accepted {accepted} bytes"))
    }
}

fn describe(err: &NodeError) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use smarthome_adapter_devnode::NodeTable;
    use smarthome_app::dispatch::Dispatcher;
    use smarthome_app::registry::Registry;

    use super::*;

    struct FixedDrift(i32);

    impl DriftSource for FixedDrift {
        fn next_delta(&self) -> i32 {
            self.0
        }
    }

    fn shell(delta: i32) -> Shell<FixedDrift> {
        let registry = Arc::new(Registry::new());
        let nodes = Arc::new(NodeTable::register(&registry, "/dev"));
        let dispatcher = Arc::new(Dispatcher::new(registry, FixedDrift(delta)));
        Shell::new(FileTable::new(dispatcher, nodes))
    }

    async fn run(shell: &Shell<FixedDrift>, script: &str) -> String {
        let mut out = Vec::new();
        shell.run(script.as_bytes(), &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn should_parse_commands() {
        assert_eq!("list".parse(), Ok(Command::List));
        assert_eq!(
            "read light_bedroom".parse(),
            Ok(Command::Read {
                node: "light_bedroom".to_string(),
                max_len: DEFAULT_READ_LEN
            })
        );
        assert_eq!(
            "read /dev/light_bedroom 2".parse(),
            Ok(Command::Read {
                node: "/dev/light_bedroom".to_string(),
                max_len: 2
            })
        );
        assert_eq!(
            "write socket_kitchen on".parse(),
            Ok(Command::Write {
                node: "socket_kitchen".to_string(),
                payload: "on".to_string()
            })
        );
        assert_eq!("quit".parse(), Ok(Command::Quit));
    }

    #[test]
    fn should_reject_malformed_commands() {
        assert_eq!(
            "read".parse::<Command>(),
            Err(ParseError::Usage("read <node> [max_len]"))
        );
        assert_eq!(
            "read x many".parse::<Command>(),
            Err(ParseError::Usage("read <node> [max_len]"))
        );
        assert_eq!(
            "write x".parse::<Command>(),
            Err(ParseError::Usage("write <node> <payload>"))
        );
        assert_eq!(
            "toggle x".parse::<Command>(),
            Err(ParseError::Unknown("toggle".to_string()))
        );
    }

    #[tokio::test]
    async fn should_list_nodes_with_modes() {
        let output = run(&shell(0), "list\n").await;
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "0\trw\tlight\t/dev/light_livingroom");
        assert_eq!(lines[3], "3\tr-\tsensor_temp\t/dev/sensor_temp_main");
    }

    #[tokio::test]
    async fn should_run_bedroom_light_scenario() {
        let output = run(
            &shell(0),
            "read light_bedroom\nwrite light_bedroom 1\ncat /dev/light_bedroom\n",
        )
        .await;
        assert_eq!(output, "off\naccepted 2 bytes\non\n");
    }

    #[tokio::test]
    async fn should_read_partially() {
        let output = run(&shell(0), "read sensor_temp_main 2\n").await;
        assert_eq!(output, "22\n");
    }

    #[tokio::test]
    async fn should_cap_read_length_at_longest_state() {
        let output = run(
            &shell(0),
            "read light_bedroom 18446744073709551615\nread sensor_temp_main 100000\n",
        )
        .await;
        assert_eq!(output, "off\n22.5\n");
    }

    #[test]
    fn should_reject_read_length_beyond_usize() {
        assert_eq!(
            "read light_bedroom 18446744073709551616".parse::<Command>(),
            Err(ParseError::Usage("read <node> [max_len]"))
        );
    }

    #[tokio::test]
    async fn should_report_device_errors_with_errno() {
        let output = run(
            &shell(0),
            "write sensor_temp_main on\nwrite light_bedroom dim\nread garage_door\n",
        )
        .await;
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(
            lines[0],
            "error: device operation failed: device sensor_temp_main is read-only (errno 1)"
        );
        assert!(lines[1].starts_with("error: device operation failed: invalid command"));
        assert!(lines[1].ends_with("(errno 22)"));
        assert_eq!(lines[2], "error: no device node at /dev/garage_door (errno 2)");
    }

    #[tokio::test]
    async fn should_skip_comments_and_stop_at_quit() {
        let output = run(&shell(0), "# setup\n\nread socket_kitchen\nquit\nread socket_kitchen\n").await;
        assert_eq!(output, "off\n");
    }

    #[tokio::test]
    async fn should_report_parse_errors_and_continue() {
        let output = run(&shell(0), "frobnicate\nread light_livingroom\n").await;
        assert_eq!(
            output,
            "error: unknown command \"frobnicate\", try `help`\noff\n"
        );
    }

    #[tokio::test]
    async fn should_release_descriptors_after_each_command() {
        let shell = shell(0);
        run(&shell, "read light_bedroom\nwrite sensor_temp_main on\ncat socket_kitchen\n").await;
        assert_eq!(shell.files.open_count(), 0);
    }
}
