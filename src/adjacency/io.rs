use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use polars::{frame::DataFrame, prelude::Column};

use crate::{common::{require_file_exists, PendingWrite}, io::csv::{read_csv_strings, str_column, write_csv}, types::TractId};

use super::AdjacencyMap;

impl AdjacencyMap {
    /// Write `tract_id,neighbor_ids`, neighbor ids comma-joined in one quoted field.
    pub fn write_csv(&self, path: &Path, force: bool) -> Result<()> {
        let (ids, lists): (Vec<&str>, Vec<String>) = self.iter()
            .map(|(id, set)| (id.as_str(), set.iter().map(TractId::as_str).collect::<Vec<_>>().join(",")))
            .unzip();

        let mut df = DataFrame::new(vec![
            Column::new("tract_id".into(), ids),
            Column::new("neighbor_ids".into(), lists),
        ])?;
        write_csv(&mut df, path, force)
    }

    /// Read a `tract_id,neighbor_ids` file. Unusable ids are skipped and logged.
    pub fn read_csv(path: &Path) -> Result<Self> {
        let df = read_csv_strings(path)?;
        let mut skipped = 0usize;
        let mut lists = Vec::with_capacity(df.height());
        for (id, neighbors) in str_column(&df, "tract_id")?.zip(str_column(&df, "neighbor_ids")?) {
            let Some(id) = id.and_then(|id| TractId::parse(id).ok()) else {
                skipped += 1;
                continue;
            };
            let list = neighbors.unwrap_or("")
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .filter_map(|s| TractId::parse(s).inspect_err(|_| skipped += 1).ok())
                .collect();
            lists.push((id, list));
        }
        if skipped > 0 {
            log::warn!("[adjacency] skipped {skipped} malformed tract ids in {}", path.display());
        }
        Ok(AdjacencyMap::from_lists(lists))
    }

    /// Write `{ tract_id: [neighbor ids] }`.
    pub fn write_json(&self, path: &Path, force: bool) -> Result<()> {
        let object: BTreeMap<&str, Vec<&str>> = self.iter()
            .map(|(id, set)| (id.as_str(), set.iter().map(TractId::as_str).collect()))
            .collect();

        let mut sink = PendingWrite::open(path, force)?;
        serde_json::to_writer_pretty(sink.file()?, &object)
            .with_context(|| format!("[adjacency] Failed to write JSON to {}", path.display()))?;
        sink.finalize()
    }

    pub fn read_json(path: &Path) -> Result<Self> {
        require_file_exists(path)?;
        let file = File::open(path)
            .with_context(|| format!("[adjacency] Failed to open {}", path.display()))?;
        let object: BTreeMap<String, Vec<String>> = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("[adjacency] Failed to parse {}", path.display()))?;

        object.into_iter()
            .map(|(id, list)| Ok((
                TractId::parse(&id)?,
                list.iter().map(|n| TractId::parse(n)).collect::<Result<Vec<_>, _>>()?,
            )))
            .collect::<Result<Vec<_>>>()
            .map(AdjacencyMap::from_lists)
            .with_context(|| format!("[adjacency] malformed tract id in {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn t(code: &str) -> TractId { TractId::new(code).unwrap() }

    fn sample() -> AdjacencyMap {
        AdjacencyMap::from_lists([
            (t("1000100"), vec![t("1000200"), t("1000300")]),
            (t("1000200"), vec![t("1000100")]),
            (t("1000300"), vec![]),
        ])
    }

    #[test]
    fn csv_quotes_joined_neighbor_lists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("neighbors.csv");
        sample().write_csv(&path, false).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("tract_id,neighbor_ids\n1000100,\"1000200,1000300\"\n"));
        assert_eq!(AdjacencyMap::read_csv(&path).unwrap(), sample());
    }

    #[test]
    fn csv_reader_pads_and_skips_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("neighbors.csv");
        fs::write(&path, "tract_id,neighbor_ids\n1000100,\"1000200, ,36061000300\"\n1000200,\n").unwrap();

        let map = AdjacencyMap::read_csv(&path).unwrap();
        assert!(map.contains(&t("1000100"), &t("1000300")));
        assert_eq!(map.neighbors(&t("1000100")).unwrap().len(), 2);
        assert!(map.neighbors(&t("1000200")).unwrap().is_empty());
    }

    #[test]
    fn json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("neighbors.json");
        sample().write_json(&path, false).unwrap();
        assert_eq!(AdjacencyMap::read_json(&path).unwrap(), sample());
    }
}
