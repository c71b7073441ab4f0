//! Synthetic text generation for the data-generation load.
//!
//! Every generated line holds between `min_words` and `max_words` words drawn
//! from a fixed dictionary, either uniformly or from a normal distribution
//! over the dictionary positions.

use crate::options::Options;
use rand::Rng;
use serde::Serialize;
use std::f64::consts::PI;

const DICTIONARY: &str = include_str!("dictionary.txt");

/// Stddev modifier used when only a mean modifier was given.
pub const DEFAULT_STDDEV_MODIFIER: f32 = 0.2;

/// The built-in word list, in file order.
pub fn dictionary() -> Vec<&'static str> {
    DICTIONARY
        .lines()
        .map(str::trim)
        .filter(|word| !word.is_empty())
        .collect()
}

/// How words are picked from the dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum WordDistribution {
    Uniform,
    /// `mean` in [-1, 1] moves the center across the dictionary;
    /// `stddev` in (0, 1) is a fraction of the dictionary size.
    Normal { mean: f32, stddev: f32 },
}

/// Settings for one generated file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratorConfig {
    pub file_size_bytes: u64,
    pub min_words: usize,
    pub max_words: usize,
    pub delimiter: String,
    pub distribution: WordDistribution,
}

impl GeneratorConfig {
    pub fn from_options(options: &Options) -> Self {
        let distribution = match (options.data_mean_words, options.data_stddev_words) {
            (None, None) => WordDistribution::Uniform,
            (mean, stddev) => WordDistribution::Normal {
                mean: mean.unwrap_or(0.0),
                stddev: stddev.unwrap_or(DEFAULT_STDDEV_MODIFIER),
            },
        };

        let min_words = options.data_min_words.max(1) as usize;
        Self {
            file_size_bytes: (options.data_file_size_mb.max(0.0) as f64 * 1024.0 * 1024.0) as u64,
            min_words,
            max_words: (options.data_max_words.max(0) as usize).max(min_words),
            delimiter: options.data_word_delimiter.clone(),
            distribution,
        }
    }
}

/// Produces lines of words until a byte budget is spent.
#[derive(Debug, Clone)]
pub struct TupleGenerator {
    config: GeneratorConfig,
}

impl TupleGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Emit lines built from `words` until `file_size_bytes` (counting one
    /// newline per line) has been reached.
    pub fn generate<R: Rng>(&self, words: &[String], rng: &mut R, mut emit: impl FnMut(String)) {
        if words.is_empty() {
            return;
        }

        let mut written = 0u64;
        let mut line = String::new();

        while written < self.config.file_size_bytes {
            line.clear();
            let count = rng.gen_range(self.config.min_words..=self.config.max_words);

            for i in 0..count {
                if i > 0 {
                    line.push_str(&self.config.delimiter);
                }
                line.push_str(&words[self.pick(words.len(), rng)]);
            }

            written += line.len() as u64 + 1;
            emit(line.clone());
        }
    }

    fn pick<R: Rng>(&self, len: usize, rng: &mut R) -> usize {
        match self.config.distribution {
            WordDistribution::Uniform => rng.gen_range(0..len),
            WordDistribution::Normal { mean, stddev } => {
                let last = (len - 1) as f64;
                let center = (mean as f64 + 1.0) / 2.0 * last;
                let spread = stddev as f64 * len as f64;
                let position = center + standard_normal(rng) * spread;
                position.round().clamp(0.0, last) as usize
            }
        }
    }
}

/// Box-Muller transform.
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1: f64 = 1.0 - rng.r#gen::<f64>();
    let u2: f64 = rng.r#gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn words() -> Vec<String> {
        dictionary().into_iter().map(String::from).collect()
    }

    fn config(distribution: WordDistribution) -> GeneratorConfig {
        GeneratorConfig {
            file_size_bytes: 4096,
            min_words: 3,
            max_words: 6,
            delimiter: " ".to_string(),
            distribution,
        }
    }

    #[test]
    fn test_dictionary_loaded() {
        let dictionary = dictionary();
        assert!(dictionary.len() > 500);
        assert!(dictionary.iter().all(|w| !w.contains(char::is_whitespace)));
    }

    #[test]
    fn test_uniform_generation_respects_bounds() {
        let generator = TupleGenerator::new(config(WordDistribution::Uniform));
        let mut rng = SmallRng::seed_from_u64(7);
        let mut lines = Vec::new();
        generator.generate(&words(), &mut rng, |line| lines.push(line));

        let bytes: usize = lines.iter().map(|l| l.len() + 1).sum();
        assert!(bytes >= 4096);
        for line in &lines {
            let count = line.split(' ').count();
            assert!((3..=6).contains(&count), "{line}");
        }
    }

    #[test]
    fn test_normal_generation_stays_in_dictionary() {
        let words = words();
        let generator = TupleGenerator::new(config(WordDistribution::Normal {
            mean: 0.9,
            stddev: 0.05,
        }));
        let mut rng = SmallRng::seed_from_u64(11);
        let mut seen = Vec::new();
        generator.generate(&words, &mut rng, |line| seen.push(line));

        let late_half = &words[words.len() / 2..];
        let total: usize = seen.iter().map(|l| l.split(' ').count()).sum();
        let late: usize = seen
            .iter()
            .flat_map(|l| l.split(' '))
            .filter(|w| late_half.iter().any(|x| x == w))
            .count();
        assert!(late * 10 > total * 8);
    }

    #[test]
    fn test_empty_budget_or_dictionary() {
        let mut cfg = config(WordDistribution::Uniform);
        cfg.file_size_bytes = 0;
        let mut rng = SmallRng::seed_from_u64(1);
        let mut count = 0;
        TupleGenerator::new(cfg).generate(&words(), &mut rng, |_| count += 1);
        TupleGenerator::new(config(WordDistribution::Uniform)).generate(&[], &mut rng, |_| {
            count += 1
        });
        assert_eq!(count, 0);
    }

    #[test]
    fn test_config_from_options() {
        let mut options = Options::default();
        options.data_file_size_mb = 0.5;
        options.data_min_words = 2;
        options.data_max_words = 4;
        options.data_word_delimiter = ",".to_string();
        let cfg = GeneratorConfig::from_options(&options);
        assert_eq!(cfg.file_size_bytes, 512 * 1024);
        assert_eq!(cfg.delimiter, ",");
        assert_eq!(cfg.distribution, WordDistribution::Uniform);

        options.data_mean_words = Some(0.5);
        let cfg = GeneratorConfig::from_options(&options);
        assert_eq!(
            cfg.distribution,
            WordDistribution::Normal {
                mean: 0.5,
                stddev: DEFAULT_STDDEV_MODIFIER
            }
        );
    }
}
