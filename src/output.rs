//! The module responsible for writing output data to disk.
use crate::constraints::BigMLink;
use crate::project::report::Report;
use crate::solver::Solution;
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which project-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "offgrid_results";

/// The output file name for installed products
const SELECTED_PRODUCTS_FILE_NAME: &str = "selected_products.csv";

/// The output file name for grid use
const GRID_FILE_NAME: &str = "grid.csv";

/// The output file name for the cost breakdown
const COSTS_FILE_NAME: &str = "costs.csv";

/// The output file name for hourly results
const HOURLY_RESULTS_FILE_NAME: &str = "hourly_results.csv";

/// The output file name for big-M diagnostics
const BIG_M_FILE_NAME: &str = "debug_big_m.csv";

/// Get the output folder for the project in the specified directory
pub fn get_output_dir(project_dir: &Path) -> Result<PathBuf> {
    let project_dir = project_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to project")?;

    let project_name = project_dir
        .file_name()
        .context("Project cannot be in root folder")?
        .to_str()
        .context("Invalid chars in project dir name")?;

    Ok([OUTPUT_DIRECTORY_ROOT, project_name].iter().collect())
}

/// Create a new output directory, if it doesn't already exist.
///
/// # Arguments
///
/// * `output_dir` - The folder to create
/// * `allow_overwrite` - Whether an existing, non-empty folder may be cleared
///
/// # Returns
///
/// Whether existing output was deleted
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let mut overwrite = false;
    if output_dir.is_dir() {
        if fs::read_dir(output_dir)?.next().is_none() {
            // Already exists and is empty
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. \
            Please delete the folder or pass the --overwrite command-line option."
        );

        fs::remove_dir_all(output_dir)?;
        overwrite = true;
    }

    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Represents a row in the big-M diagnostics CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct BigMRow {
    name: String,
    big_m: f64,
    value: f64,
    holds: bool,
}

/// For writing solver diagnostics
struct DebugDataWriter {
    big_m_writer: csv::Writer<File>,
}

impl DebugDataWriter {
    /// Open CSV files to write debug info to
    fn create(output_path: &Path) -> Result<Self> {
        Ok(Self {
            big_m_writer: csv::Writer::from_path(output_path.join(BIG_M_FILE_NAME))?,
        })
    }

    /// Write the value of each big-M link's quantity alongside its M
    fn write_big_m_links<'a, I>(&mut self, links: I, solution: &Solution) -> Result<()>
    where
        I: IntoIterator<Item = &'a BigMLink>,
    {
        for link in links {
            let row = BigMRow {
                name: link.name.clone(),
                big_m: link.big_m,
                value: solution.evaluate(&link.quantity),
                holds: link.holds_for(solution),
            };
            self.big_m_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    fn flush(&mut self) -> Result<()> {
        self.big_m_writer.flush()?;

        Ok(())
    }
}

/// An object for writing project results to file
pub struct DataWriter {
    selected_products_writer: csv::Writer<File>,
    grid_writer: csv::Writer<File>,
    costs_writer: csv::Writer<File>,
    hourly_writer: csv::Writer<File>,
    debug_writer: Option<DebugDataWriter>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    /// * `save_debug_info` - Whether to include extra CSV files for debugging the model
    pub fn create(output_path: &Path, save_debug_info: bool) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        let debug_writer = if save_debug_info {
            Some(DebugDataWriter::create(output_path)?)
        } else {
            None
        };

        Ok(Self {
            selected_products_writer: new_writer(SELECTED_PRODUCTS_FILE_NAME)?,
            grid_writer: new_writer(GRID_FILE_NAME)?,
            costs_writer: new_writer(COSTS_FILE_NAME)?,
            hourly_writer: new_writer(HOURLY_RESULTS_FILE_NAME)?,
            debug_writer,
        })
    }

    /// Write all results of a report to CSV files
    pub fn write_report(&mut self, report: &Report) -> Result<()> {
        for product in &report.selected_products {
            self.selected_products_writer.serialize(product)?;
        }
        self.grid_writer.serialize(&report.grid)?;
        self.costs_writer.serialize(&report.costs)?;
        for row in &report.hourly {
            self.hourly_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Write big-M diagnostics, if debug info is enabled
    pub fn write_debug_info<'a, I>(&mut self, links: I, solution: &Solution) -> Result<()>
    where
        I: IntoIterator<Item = &'a BigMLink>,
    {
        if let Some(wtr) = &mut self.debug_writer {
            wtr.write_big_m_links(links, solution)?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.selected_products_writer.flush()?;
        self.grid_writer.flush()?;
        self.costs_writer.flush()?;
        self.hourly_writer.flush()?;
        if let Some(wtr) = &mut self.debug_writer {
            wtr.flush()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{flat_inputs, new_model, solar_entry};
    use crate::project::Project;
    use crate::solver::HighsModel;
    use itertools::Itertools;
    use rstest::{fixture, rstest};
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[fixture]
    fn solved_project() -> Project<HighsModel> {
        let mut project =
            Project::build(new_model(), flat_inputs(vec![solar_entry()], 8.0)).unwrap();
        project.optimize().unwrap();
        project
    }

    fn read_rows(path: &Path) -> Vec<HashMap<String, String>> {
        csv::Reader::from_path(path)
            .unwrap()
            .into_deserialize()
            .try_collect()
            .unwrap()
    }

    #[test]
    fn test_create_output_directory() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("results");

        // New folder
        assert!(!create_output_directory(&output_dir, false).unwrap());
        assert!(output_dir.is_dir());

        // Empty existing folder
        assert!(!create_output_directory(&output_dir, false).unwrap());

        // Non-empty existing folder
        fs::write(output_dir.join("file.txt"), "contents").unwrap();
        assert!(create_output_directory(&output_dir, false).is_err());
        assert!(create_output_directory(&output_dir, true).unwrap());
        assert!(!output_dir.join("file.txt").exists());
    }

    #[rstest]
    fn test_write_report(mut solved_project: Project<HighsModel>) {
        let report = solved_project.report().unwrap();
        let dir = tempdir().unwrap();
        {
            let mut writer = DataWriter::create(dir.path(), false).unwrap();
            writer.write_report(&report).unwrap();
            writer.flush().unwrap();
        }

        let products = read_rows(&dir.path().join(SELECTED_PRODUCTS_FILE_NAME));
        assert_eq!(products.len(), 1);
        assert_eq!(products[0]["product_id"], "panel");
        assert_eq!(products[0]["energy_type"], "solar");
        assert_eq!(products[0]["units"], "1");

        assert_eq!(read_rows(&dir.path().join(COSTS_FILE_NAME)).len(), 1);
        assert_eq!(read_rows(&dir.path().join(GRID_FILE_NAME)).len(), 1);
        assert_eq!(read_rows(&dir.path().join(HOURLY_RESULTS_FILE_NAME)).len(), 24);
        assert!(!dir.path().join(BIG_M_FILE_NAME).exists());
    }

    #[rstest]
    fn test_write_debug_info(solved_project: Project<HighsModel>) {
        let dir = tempdir().unwrap();
        {
            let mut writer = DataWriter::create(dir.path(), true).unwrap();
            writer
                .write_debug_info(
                    solved_project.big_m_links(),
                    solved_project.solution().unwrap(),
                )
                .unwrap();
            writer.flush().unwrap();
        }

        let records: Vec<BigMRow> = csv::Reader::from_path(dir.path().join(BIG_M_FILE_NAME))
            .unwrap()
            .into_deserialize()
            .try_collect()
            .unwrap();
        assert_eq!(records.len(), solved_project.big_m_links().count());
        assert!(records.iter().all(|row| row.holds));
    }
}
