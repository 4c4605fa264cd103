use std::{
    collections::VecDeque,
    fs::{File, OpenOptions},
    io::{self, BufRead, BufReader, Write},
    path::Path,
    sync::Arc,
};

use parking_lot::Mutex;

/// Removes ANSI escape sequences so the log file stays plain text.
pub fn strip_ansi_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' {
            in_escape = true;
        } else if in_escape {
            if c.is_ascii_alphabetic() {
                in_escape = false;
            }
        } else {
            result.push(c);
        }
    }
    result
}

/// Append-only log file that is trimmed back to its newest `max_lines` lines.
///
/// Trimming runs after every `max_lines / 10` (at least 50) appended lines
/// rather than on each write.
#[derive(Clone)]
pub struct CircularFileWriter {
    path: String,
    max_lines: u32,
    pending_lines: Arc<Mutex<u32>>,
}

impl CircularFileWriter {
    pub fn new(path: String, max_lines: u32) -> Self {
        Self {
            path,
            max_lines: max_lines.max(1),
            pending_lines: Arc::new(Mutex::new(0)),
        }
    }

    fn prune_threshold(&self) -> u32 {
        (self.max_lines / 10).max(50)
    }

    fn prune(&self) -> io::Result<()> {
        if !Path::new(&self.path).exists() {
            return Ok(());
        }

        let reader = BufReader::new(File::open(&self.path)?);
        let mut tail: VecDeque<String> = VecDeque::with_capacity(self.max_lines as usize + 1);
        let mut total = 0usize;
        for line in reader.lines() {
            tail.push_back(line?);
            total += 1;
            if tail.len() > self.max_lines as usize {
                tail.pop_front();
            }
        }

        if total > tail.len() {
            let mut file = File::create(&self.path)?;
            for line in &tail {
                writeln!(file, "{}", line)?;
            }
        }
        Ok(())
    }
}

impl io::Write for CircularFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut pending = self.pending_lines.lock();

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?
            .write_all(buf)?;

        *pending += buf.iter().filter(|&&b| b == b'\n').count() as u32;
        if *pending >= self.prune_threshold() {
            if let Err(e) = self.prune() {
                eprintln!("Failed to prune log file: {}", e);
            }
            *pending = 0;
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CircularFileWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
