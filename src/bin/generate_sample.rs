//! Writes `sample_script_features.tsv`, a synthetic stand-in for the script
//! features dataset, for trying the CLI offline.

use std::error::Error;

const FLAG_COLUMNS: [(&str, f64); 7] = [
    ("sure_frontend_processing", 0.35),
    ("sure_dom_element_generation", 0.20),
    ("sure_ux_enhancement", 0.11),
    ("sure_extensional_featuers", 0.12),
    ("has_request", 0.10),
    ("queries_element", 0.34),
    ("uses_storage", 0.11),
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let mut rng = SimpleRng::new(42);
    let n_scripts = 5_000;
    let output_path = "sample_script_features.tsv";

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(output_path)?;
    let mut header = vec!["id", "size", "total_call", "silent"];
    header.extend(FLAG_COLUMNS.iter().map(|(name, _)| *name));
    writer.write_record(&header)?;

    for id in 0..n_scripts {
        // Script sizes are roughly log-normal, from a few bytes to megabytes.
        let size = rng.gauss(7.7, 2.2).exp().clamp(9.0, 9.0e6).round() as u64;
        // A quarter of scripts make no API calls at all.
        let total_call = if rng.next_f64() < 0.25 {
            0
        } else {
            rng.gauss(2.0, 2.0).exp().round() as u64
        };

        let mut record = vec![
            id.to_string(),
            size.to_string(),
            total_call.to_string(),
            u8::from(total_call == 0).to_string(),
        ];
        for (_, rate) in FLAG_COLUMNS {
            let on = total_call > 0 && rng.next_f64() < rate / 0.75;
            record.push(u8::from(on).to_string());
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;

    println!("Wrote {n_scripts} synthetic scripts to {output_path}");
    Ok(())
}
