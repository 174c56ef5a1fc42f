//! Common, IO-related code.

use std::{
    fs::{File, OpenOptions},
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use flate2::{bufread::MultiGzDecoder, write::GzEncoder, Compression};

/// Transparently open a file with gzip decoder.
pub fn open_read_maybe_gz<P>(path: P) -> Result<Box<dyn BufRead>, anyhow::Error>
where
    P: AsRef<Path>,
{
    if path.as_ref().extension().map(|s| s.to_str()) == Some(Some("gz")) {
        tracing::trace!("Opening {:?} as gzip for reading", path.as_ref());
        let file = File::open(path)?;
        let bufreader = BufReader::new(file);
        let decoder = MultiGzDecoder::new(bufreader);
        Ok(Box::new(BufReader::new(decoder)))
    } else {
        tracing::trace!("Opening {:?} as plain text for reading", path.as_ref());
        let file = File::open(path)?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Transparently open a file with gzip encoder.
pub fn open_write_maybe_gz<P>(path: P) -> Result<Box<dyn Write>, anyhow::Error>
where
    P: AsRef<Path>,
{
    if path.as_ref().extension().map(|s| s.to_str()) == Some(Some("gz")) {
        tracing::trace!("Opening {:?} as gzip for writing", path.as_ref());
        let file = File::create(path)?;
        let bufwriter = BufWriter::new(file);
        let encoder = GzEncoder::new(bufwriter, Compression::default());
        Ok(Box::new(encoder))
    } else {
        tracing::trace!("Opening {:?} as plain text for writing", path.as_ref());
        let file = File::create(path)?;
        Ok(Box::new(BufWriter::new(file)))
    }
}

/// Read newline-delimited JSON from a plain or gzip file, skipping blank lines.
pub fn read_json_lines<T, P>(path: P) -> Result<Vec<T>, anyhow::Error>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let reader = open_read_maybe_gz(path.as_ref())?;
    let mut result = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        result.push(serde_json::from_str(&line).map_err(|e| {
            anyhow::anyhow!("invalid JSON in line {} of {:?}: {}", i + 1, path.as_ref(), e)
        })?);
    }
    Ok(result)
}

/// Write `values` as newline-delimited JSON to a plain or gzip file.
pub fn write_json_lines<'a, T, P, I>(path: P, values: I) -> Result<(), anyhow::Error>
where
    T: serde::Serialize + 'a,
    P: AsRef<Path>,
    I: IntoIterator<Item = &'a T>,
{
    let mut writer = open_write_maybe_gz(path)?;
    for value in values {
        serde_json::to_writer(&mut writer, value)?;
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Append `values` as newline-delimited JSON, creating the file if missing.
///
/// Gzip output is appended as a new gzip member, which `open_read_maybe_gz`
/// reads back transparently.
pub fn append_json_lines<'a, T, P, I>(path: P, values: I) -> Result<(), anyhow::Error>
where
    T: serde::Serialize + 'a,
    P: AsRef<Path>,
    I: IntoIterator<Item = &'a T>,
{
    tracing::trace!("Opening {:?} for appending", path.as_ref());
    let file = OpenOptions::new().create(true).append(true).open(path.as_ref())?;
    let mut writer: Box<dyn Write> = if path.as_ref().extension().map(|s| s.to_str()) == Some(Some("gz")) {
        Box::new(GzEncoder::new(BufWriter::new(file), Compression::default()))
    } else {
        Box::new(BufWriter::new(file))
    };
    for value in values {
        serde_json::to_writer(&mut writer, value)?;
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Entry {
        id: String,
        count: usize,
    }

    #[rstest::rstest]
    #[case("entries.jsonl")]
    #[case("entries.jsonl.gz")]
    fn json_lines_round_trip(#[case] filename: &str) -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let entries = vec![
            Entry {
                id: "a".into(),
                count: 1,
            },
            Entry {
                id: "b".into(),
                count: 2,
            },
        ];

        super::write_json_lines(tmp_dir.join(filename), &entries)?;
        let read: Vec<Entry> = super::read_json_lines(tmp_dir.join(filename))?;
        assert_eq!(read, entries);

        Ok(())
    }

    #[rstest::rstest]
    #[case("entries.jsonl")]
    #[case("entries.jsonl.gz")]
    fn append_json_lines(#[case] filename: &str) -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path = tmp_dir.join(filename);
        let first = Entry {
            id: "a".into(),
            count: 1,
        };
        let second = Entry {
            id: "b".into(),
            count: 2,
        };

        super::append_json_lines(&path, [&first])?;
        super::append_json_lines(&path, [&second])?;
        let read: Vec<Entry> = super::read_json_lines(&path)?;
        assert_eq!(read, vec![first, second]);

        Ok(())
    }

    #[test]
    fn gzip_output_is_compressed() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        {
            let mut f = super::open_write_maybe_gz(tmp_dir.join("test.txt.gz"))?;
            f.write_all(b"hello")?;
        }
        let buf = std::fs::read(tmp_dir.join("test.txt.gz"))?;
        assert_eq!(&buf[..2], &[0x1f, 0x8b]);

        Ok(())
    }

    #[test]
    fn read_json_lines_skips_blank_lines() -> Result<(), anyhow::Error> {
        let tmp_dir = temp_testdir::TempDir::default();
        let path = tmp_dir.join("entries.jsonl");
        std::fs::write(&path, "{\"id\":\"a\",\"count\":1}\n\n  \n{\"id\":\"b\",\"count\":2}\n")?;

        let read: Vec<Entry> = super::read_json_lines(&path)?;
        assert_eq!(read.len(), 2);

        std::fs::write(&path, "{\"id\":\"a\",\"count\":1}\n{\"id\":\n")?;
        let err = super::read_json_lines::<Entry, _>(&path).unwrap_err();
        assert!(err.to_string().contains("line 2"));

        Ok(())
    }
}
