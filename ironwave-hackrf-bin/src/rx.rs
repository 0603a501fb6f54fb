use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use clap::Args;
use color_eyre::eyre::Context;
use crossbeam_channel::{TrySendError, bounded, select};
use ironwave_hackrf::{Device, StreamControl};
use tracing::warn;

#[derive(Args, Debug)]
pub struct Cmd {
    /// Frequency in Hz. Preferred range is 1MHz-6000MHz.
    #[arg(short, long, default_value_t = 433_000_000)]
    freq_hz: u64,

    /// Sample rate in Hz (2-20 MHz)
    #[arg(short = 'r', long = "rate", default_value_t = 10e6)]
    sample_rate_hz: f64,

    /// Baseband filter bandwidth in Hz. The nearest supported value is used.
    #[arg(short, long = "baseband", default_value_t = 10_000_000)]
    baseband_filter_bw_hz: u32,

    /// RX LNA (IF) gain, 0-40dB, 8dB steps
    #[arg(short = 'l', long = "lna", default_value_t = 32)]
    lna_gain: u32,

    /// RX VGA (baseband) gain, 0-62dB, 2dB steps
    #[arg(short = 'g', long = "vga", default_value_t = 40)]
    vga_gain: u32,

    /// Enable the front-end RF amplifier
    #[arg(short = 'a', long = "amp")]
    amp_enable: bool,
}

// Per-block statistics shipped off the driver's streaming thread.
struct BlockStats {
    bytes: usize,
    min_amplitude: f64,
    max_amplitude: f64,
}

impl Cmd {
    pub fn run(&self, device: &Device) -> color_eyre::Result<()> {
        device
            .set_frequency(self.freq_hz)
            .wrap_err("failed setting frequency")?;
        device
            .set_sample_rate(self.sample_rate_hz)
            .wrap_err("failed setting sample rate")?;
        device
            .set_filter_bandwidth(self.baseband_filter_bw_hz)
            .wrap_err("failed setting filter bandwidth")?;
        device
            .set_lna_gain(self.lna_gain)
            .wrap_err("failed setting LNA gain")?;
        device
            .set_vga_gain(self.vga_gain)
            .wrap_err("failed setting VGA gain")?;
        device
            .set_lna_enabled(self.amp_enable)
            .wrap_err("failed setting RF amplifier")?;

        println!("serial:      {}", device.serial());
        println!("frequency:   {:.1} MHz", device.frequency() as f64 / 1e6);
        println!("sample rate: {:.1} MHz", device.sample_rate() / 1e6);
        println!("filter:      {:.1} MHz", device.filter_bandwidth() as f64 / 1e6);
        println!("LNA gain:    {} dB", device.lna_gain());
        println!("VGA gain:    {} dB", device.vga_gain());
        println!("RF amp:      {}", device.lna_enabled());

        // The callback only measures and forwards; aggregation and printing
        // stay on this thread so the callback returns promptly.
        let (stats_tx, stats_rx) = bounded::<BlockStats>(64);
        let dropped = Arc::new(AtomicUsize::new(0));
        let dropped_in_callback = dropped.clone();
        device
            .start_rx(move |transfer| {
                let bytes = transfer.rx_bytes().len();
                if bytes == 0 {
                    return StreamControl::Continue;
                }
                let mut min_amplitude = f64::INFINITY;
                let mut max_amplitude = 0.0f64;
                for sample in transfer.rx_samples() {
                    let i = sample.re as f64;
                    let q = sample.im as f64;
                    let amplitude = (i * i + q * q).sqrt();
                    min_amplitude = min_amplitude.min(amplitude);
                    max_amplitude = max_amplitude.max(amplitude);
                }
                match stats_tx.try_send(BlockStats {
                    bytes,
                    min_amplitude,
                    max_amplitude,
                }) {
                    Ok(()) => StreamControl::Continue,
                    Err(TrySendError::Full(_)) => {
                        // The samples already flowed; losing a stats block is
                        // preferable to stalling the streaming thread.
                        dropped_in_callback.fetch_add(1, Ordering::Relaxed);
                        StreamControl::Continue
                    }
                    Err(TrySendError::Disconnected(_)) => StreamControl::Stop,
                }
            })
            .wrap_err("failed starting receive")?;

        println!("\nreceiving; press Enter to stop");

        let (stop_tx, stop_rx) = bounded::<()>(1);
        std::thread::spawn(move || {
            let mut line = String::new();
            let _ = std::io::stdin().read_line(&mut line);
            let _ = stop_tx.send(());
        });

        let started = Instant::now();
        let mut total_bytes = 0u64;
        let mut window_min = f64::INFINITY;
        let mut window_max = 0.0f64;
        let mut last_print = Instant::now();
        loop {
            select! {
                recv(stats_rx) -> stats => {
                    let Ok(stats) = stats else { break };
                    total_bytes += stats.bytes as u64;
                    window_min = window_min.min(stats.min_amplitude);
                    window_max = window_max.max(stats.max_amplitude);
                    if last_print.elapsed() >= Duration::from_secs(1) {
                        let samples = total_bytes / 2;
                        let rate = samples as f64 / started.elapsed().as_secs_f64();
                        println!(
                            "samples: {samples} | rate: {:.2} MS/s | amplitude: min={:.1} max={:.1}",
                            rate / 1e6,
                            if window_min.is_finite() { window_min } else { 0.0 },
                            window_max,
                        );
                        window_min = f64::INFINITY;
                        window_max = 0.0;
                        last_print = Instant::now();
                    }
                }
                recv(stop_rx) -> _ => break,
            }
        }

        println!("\nstopping receive");
        device.stop_rx().wrap_err("failed stopping receive")?;

        let dropped = dropped.load(Ordering::Relaxed);
        if dropped > 0 {
            warn!(dropped, "stats blocks were dropped");
        }

        let elapsed = started.elapsed().as_secs_f64();
        let samples = total_bytes / 2;
        println!("total time:    {elapsed:.1} s");
        println!("samples:       {samples}");
        println!("average rate:  {:.2} MS/s", samples as f64 / elapsed / 1e6);
        println!(
            "data volume:   {total_bytes} bytes ({:.1} MiB)",
            total_bytes as f64 / (1024.0 * 1024.0)
        );
        Ok(())
    }
}
