//! The two-stage `btrfs send | btrfs receive` pipeline.

use std::io::BufReader;
use std::path::Path;
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};

#[cfg(unix)]
use std::os::unix::process::ExitStatusExt;

use crate::error::PipelineError;
use crate::run::render;

/// How the consumer side of the pipeline is run.
#[derive(Clone, Debug)]
pub enum ReceiveMode {
    /// `btrfs receive <dir>`: materialize the snapshot natively under the
    /// given btrfs directory.
    Native(std::path::PathBuf),
    /// `btrfs receive --dump`: render the stream as text records on stdout
    /// for the replay engine to consume.
    Dump,
}

/// Combined exit status of both pipeline stages.
#[derive(Clone, Copy, Debug)]
pub struct PipelineStatus {
    /// Exit status of the producing `btrfs send`.
    pub producer: ExitStatus,
    /// Exit status of the consuming `btrfs receive`.
    pub consumer: ExitStatus,
}

impl PipelineStatus {
    /// Whether the pipeline as a whole succeeded.
    ///
    /// A producer killed by SIGPIPE while the consumer exited cleanly counts
    /// as success: `btrfs send` is sometimes signalled during shutdown after
    /// the consumer has already received the complete stream.
    #[must_use]
    pub fn success(&self) -> bool {
        if !self.consumer.success() {
            return false;
        }
        if self.producer.success() {
            return true;
        }
        #[cfg(unix)]
        {
            self.producer.signal() == Some(libc::SIGPIPE)
        }
        #[cfg(not(unix))]
        {
            false
        }
    }

    /// Converts a completed status into a result.
    pub fn ensure_success(self) -> Result<(), PipelineError> {
        if self.success() {
            Ok(())
        } else {
            Err(PipelineError::Failed {
                producer: self.producer,
                consumer: self.consumer,
            })
        }
    }
}

/// A spawned producer/consumer pair, joined on [`SendPipeline::wait`].
#[derive(Debug)]
pub struct SendPipeline {
    producer: Child,
    consumer: Child,
}

impl SendPipeline {
    /// Spawns an incremental `btrfs send -p <parent> <snap>` piped into
    /// `btrfs receive` in the given mode.
    pub fn btrfs_send(
        parent: &Path,
        snap: &Path,
        mode: &ReceiveMode,
    ) -> Result<Self, PipelineError> {
        let mut producer = Command::new("btrfs");
        producer.arg("send").arg("-p").arg(parent).arg(snap);

        let mut consumer = Command::new("btrfs");
        consumer.arg("receive");
        match mode {
            ReceiveMode::Native(dir) => {
                consumer.arg(dir);
            }
            ReceiveMode::Dump => {
                consumer.arg("--dump");
                consumer.stdout(Stdio::piped());
            }
        }

        Self::from_commands(producer, consumer)
    }

    /// Wires an arbitrary producer/consumer pair together and spawns both.
    ///
    /// The producer's stdout is moved into the consumer's stdin, leaving the
    /// consumer with the only handle on the pipe.
    pub fn from_commands(
        mut producer: Command,
        mut consumer: Command,
    ) -> Result<Self, PipelineError> {
        let spawn_err = |command: &Command, source| PipelineError::Spawn {
            program: command.get_program().to_string_lossy().into_owned(),
            source,
        };

        producer.stdout(Stdio::piped());
        tracing::info!(command = %render(&producer), "spawning producer");
        let mut producer_child = producer.spawn().map_err(|e| spawn_err(&producer, e))?;
        let stream = producer_child
            .stdout
            .take()
            .ok_or_else(|| PipelineError::MissingStream {
                program: producer.get_program().to_string_lossy().into_owned(),
                stream: "stdout",
            })?;

        consumer.stdin(Stdio::from(stream));
        tracing::info!(command = %render(&consumer), "spawning consumer");
        let consumer_child = match consumer.spawn() {
            Ok(child) => child,
            Err(source) => {
                // The producer is already running; reap it so a consumer
                // spawn failure does not leave a zombie behind.
                let _ = producer_child.kill();
                let _ = producer_child.wait();
                return Err(spawn_err(&consumer, source));
            }
        };

        Ok(Self {
            producer: producer_child,
            consumer: consumer_child,
        })
    }

    /// Takes the consumer's stdout as a buffered line source.
    ///
    /// Only available in dump mode; the native mode consumer inherits our
    /// stdout.
    pub fn dump_stream(&mut self) -> Result<BufReader<ChildStdout>, PipelineError> {
        self.consumer
            .stdout
            .take()
            .map(BufReader::new)
            .ok_or_else(|| PipelineError::MissingStream {
                program: "btrfs receive".to_owned(),
                stream: "stdout",
            })
    }

    /// Waits for both stages and reports their combined status.
    pub fn wait(mut self) -> Result<PipelineStatus, PipelineError> {
        let producer = self.producer.wait().map_err(|source| PipelineError::Wait {
            program: "producer".to_owned(),
            source,
        })?;
        let consumer = self.consumer.wait().map_err(|source| PipelineError::Wait {
            program: "consumer".to_owned(),
            source,
        })?;
        let status = PipelineStatus { producer, consumer };
        tracing::debug!(
            producer = %status.producer,
            consumer = %status.consumer,
            "pipeline complete"
        );
        Ok(status)
    }
}
