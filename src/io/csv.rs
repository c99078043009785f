/*!
# I/O Utilities for Saving Tempering Runs to CSV

This module provides a function to save the cold-chain history of a tempering
run to a CSV file. Enable via the `csv` feature.
*/

use csv::Writer;
use std::fs::File;
use std::path::Path;

use crate::error::Result;
use crate::parallel_tempering::TemperingRun;

/**
Saves the cold-chain history of a [`TemperingRun`] as a CSV file.

The resulting CSV file will have:
- A header row containing `"iteration"`, one column per dimension named
  `"dim_0"`, `"dim_1"`, etc., and `"log_posterior"`.
- One subsequent row per recorded iteration, in recording order.

# Arguments

* `run` - The finished tempering run whose history should be written.
* `path` - The file path where the CSV data will be written.

# Returns

Returns `Ok(())` if successful, or an error if any I/O or CSV formatting
issue occurs.

# Examples

```rust
use tempered_mcmc::distributions::SphericalGaussian;
use tempered_mcmc::io::csv::save_csv;
use tempered_mcmc::parallel_tempering::{ParallelTempering, TemperingConfig};

let mut sampler = ParallelTempering::new(
    SphericalGaussian { std: 1.0 },
    &[0.0],
    TemperingConfig::default(),
)
.unwrap()
.set_seed(42);
let run = sampler.run(10, 0).unwrap();

save_csv(&run, "/tmp/cold_chain.csv").expect("Expecting saving data to succeed");
```
*/
pub fn save_csv<T: std::fmt::Display>(run: &TemperingRun<T>, path: impl AsRef<Path>) -> Result<()> {
    let mut wtr = Writer::from_writer(File::create(path)?);
    let n_dims = run.samples.ncols();

    let mut header: Vec<String> = vec!["iteration".to_string()];
    header.extend((0..n_dims).map(|i| format!("dim_{}", i)));
    header.push("log_posterior".to_string());
    wtr.write_record(&header)?;

    for (i, (row, lp)) in run
        .samples
        .rows()
        .into_iter()
        .zip(run.log_posterior.iter())
        .enumerate()
    {
        let mut record = vec![i.to_string()];
        record.extend(row.iter().map(|v| v.to_string()));
        record.push(lp.to_string());
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::SphericalGaussian;
    use crate::parallel_tempering::{ParallelTempering, TemperingConfig};
    use csv::Reader;
    use std::fs;
    use tempfile::NamedTempFile;

    fn small_run(dim: usize, n_collect: usize) -> TemperingRun<f64> {
        let mut sampler = ParallelTempering::new(
            SphericalGaussian { std: 1.0 },
            &vec![0.0; dim],
            TemperingConfig::default(),
        )
        .unwrap()
        .set_seed(42);
        sampler.run(n_collect, 0).unwrap()
    }

    #[test]
    fn test_save_csv_header_and_row_count() {
        let run = small_run(2, 25);
        let file = NamedTempFile::new().expect("Could not create temp file");
        save_csv(&run, file.path()).expect("Saving run to CSV failed");

        let contents = fs::read_to_string(file.path()).unwrap();
        let mut rdr = Reader::from_reader(contents.as_bytes());
        let headers = rdr.headers().unwrap();
        assert_eq!(&headers[0], "iteration");
        assert_eq!(&headers[1], "dim_0");
        assert_eq!(&headers[2], "dim_1");
        assert_eq!(&headers[3], "log_posterior");

        let records: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 25);
    }

    #[test]
    fn test_save_csv_round_trip() {
        let run = small_run(1, 10);
        let file = NamedTempFile::new().expect("Could not create temp file");
        save_csv(&run, file.path()).expect("Saving run to CSV failed");

        let contents = fs::read_to_string(file.path()).unwrap();
        let mut rdr = Reader::from_reader(contents.as_bytes());
        for (i, record) in rdr.records().enumerate() {
            let record = record.unwrap();
            assert_eq!(record[0].parse::<usize>().unwrap(), i);
            let x: f64 = record[1].parse().unwrap();
            let lp: f64 = record[2].parse().unwrap();
            assert_eq!(x, run.samples[[i, 0]]);
            assert_eq!(lp, run.log_posterior[i]);
        }
    }
}
