mod opts;

use anyhow::{bail, Context as _};
use memscan::{AddressRange, ProcessMemory, Progress, ScanEngine, ScanType, Scalar};
use std::{
    env, fs,
    io::{self, BufRead, Write},
    iter,
    path::{Path, PathBuf},
    process,
    str::FromStr,
};

fn try_main() -> anyhow::Result<()> {
    let opts = opts::opts();
    let stdin = io::stdin();
    let stdout = io::stdout();

    let mut app = Application::new(stdin.lock(), stdout.lock(), opts);
    app.run()
}

fn main() {
    if let Err(e) = try_main() {
        eprintln!("{}", e);

        for cause in e.chain().skip(1) {
            eprintln!("Caused by: {}", cause);
        }

        process::exit(1);
    }
}

#[cfg(windows)]
fn open_process(pid: u32) -> anyhow::Result<memscan::WindowsProcess> {
    Ok(memscan::WindowsProcess::open(pid)?)
}

#[cfg(not(windows))]
fn open_process(pid: u32) -> anyhow::Result<UnsupportedProcess> {
    bail!("attaching to process {} is only supported on Windows", pid)
}

/// Placeholder target for platforms without a native binding.
#[cfg(not(windows))]
struct UnsupportedProcess;

#[cfg(not(windows))]
impl ProcessMemory for UnsupportedProcess {
    fn region_info(
        &self,
        _: memscan::Address,
    ) -> Result<Option<memscan::RegionInfo>, memscan::Error> {
        Err(unsupported())
    }

    fn read_memory(&self, _: memscan::Address, _: &mut [u8]) -> Result<usize, memscan::Error> {
        Err(unsupported())
    }

    fn address_bounds(&self) -> Result<AddressRange, memscan::Error> {
        Err(unsupported())
    }
}

#[cfg(not(windows))]
fn unsupported() -> memscan::Error {
    memscan::Error::System(io::Error::new(
        io::ErrorKind::Unsupported,
        "process memory access is not supported on this platform",
    ))
}

/// Scratch directory for the engine's dump files, removed on exit.
struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    fn create() -> anyhow::Result<ScratchDir> {
        let path = env::temp_dir().join(format!("memscan-{}", process::id()));
        fs::create_dir_all(&path)
            .with_context(|| format!("failed to create scratch directory {}", path.display()))?;
        Ok(ScratchDir { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Renders pass progress as a simple bar.
struct BarProgress<'a, W: Write> {
    out: &'a mut W,
}

impl<'a, W: Write> Progress for BarProgress<'a, W> {
    fn report_regions(&mut self, _: usize) {}

    fn report(&mut self, percentage: usize, entries: u64) {
        let bar: String = iter::repeat('#').take(percentage / 10).collect();
        let _ = write!(self.out, "\r{}: {}% ({} results)", bar, percentage, entries);
        let _ = self.out.flush();
    }
}

struct Application<R, W> {
    r: R,
    w: W,
    opts: opts::Opts,
}

impl<R, W> Application<R, W>
where
    R: BufRead,
    W: Write,
{
    fn new(r: R, w: W, opts: opts::Opts) -> Application<R, W> {
        Application { r, w, opts }
    }

    fn run(&mut self) -> anyhow::Result<()> {
        let pid = match self.opts.pid {
            Some(pid) => pid,
            None => self.prompt_pid()?,
        };

        let process = open_process(pid)?;
        let value_type = self.opts.value_type.clone();

        match value_type.as_str() {
            "i32" => self.session::<i32, _>(process),
            "u32" => self.session::<u32, _>(process),
            "i64" => self.session::<i64, _>(process),
            "u64" => self.session::<u64, _>(process),
            "f32" => self.session::<f32, _>(process),
            "f64" => self.session::<f64, _>(process),
            other => bail!("unsupported value type: {}", other),
        }
    }

    /// Seed an exact-value scan, then keep narrowing until the operator
    /// declines. Results are printed on the way out.
    fn session<T, P>(&mut self, process: P) -> anyhow::Result<()>
    where
        T: Scalar + FromStr,
        P: ProcessMemory + 'static,
    {
        let bounds = process
            .address_bounds()
            .context("failed to query the target's usable address range")?;

        let scratch = ScratchDir::create()?;
        let mut engine = ScanEngine::<T, P>::new(process, scratch.path())
            .context("failed to create the scratch stores")?;

        loop {
            let value = self.prompt_value::<T>()?;
            let total = self.scan(&mut engine, bounds, value)?;
            writeln!(self.w, "Total values found: {}", total)?;

            let answer = self.prompt("Scan again? (y/n) ")?;

            if !answer.trim().eq_ignore_ascii_case("y") {
                break;
            }
        }

        if let Some(results) = engine.results() {
            results.for_each(|_, result| {
                for entry in result.entries().iter() {
                    let _ = writeln!(self.w, "Value: {} Address: {}", entry.value, entry.address);
                }
            });
        }

        Ok(())
    }

    fn scan<T, P>(
        &mut self,
        engine: &mut ScanEngine<T, P>,
        bounds: AddressRange,
        value: T,
    ) -> anyhow::Result<u64>
    where
        T: Scalar,
        P: ProcessMemory + 'static,
    {
        let total = {
            let mut progress = BarProgress { out: &mut self.w };
            engine.scan_with_progress(bounds, ScanType::ExactValue, value, None, &mut progress)
        };

        writeln!(self.w)?;
        Ok(total)
    }

    fn prompt(&mut self, what: &str) -> anyhow::Result<String> {
        write!(self.w, "{}", what)?;
        self.w.flush()?;

        let mut line = String::new();

        if self.r.read_line(&mut line)? == 0 {
            bail!("input closed");
        }

        Ok(line)
    }

    fn prompt_pid(&mut self) -> anyhow::Result<u32> {
        loop {
            let line = self.prompt("Enter the process id: ")?;

            match line.trim().parse() {
                Ok(pid) => return Ok(pid),
                Err(_) => writeln!(self.w, "invalid process id")?,
            }
        }
    }

    fn prompt_value<T: FromStr>(&mut self) -> anyhow::Result<T> {
        loop {
            let line = self.prompt("Value to search for: ")?;

            match line.trim().parse() {
                Ok(value) => return Ok(value),
                Err(_) => writeln!(self.w, "invalid value")?,
            }
        }
    }
}
