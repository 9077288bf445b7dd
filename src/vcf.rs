//! VCF (Variant Call Format) text decoder.

use crate::buffered_reader::BufferedReader;
use crate::config::{open_source, AnySource, Config};
use crate::error::{Result, SeqioError};
use crate::source::ByteSource;

/// A single metadata line: the header allows arbitrary `##key=value` pairs,
/// kept verbatim and not interpreted further.
pub type HeaderLine = (String, String);

/// A VCF record borrowed from the reader's internal buffer. The scalar
/// fields borrow directly; the split fields (`alt`, `filter`, ...) are
/// freshly allocated `Vec`s of borrows, rebuilt on every [`VcfReader::next`]
/// call and invalidated the same way as the scalar borrows.
#[derive(Debug, Clone, PartialEq)]
pub struct VcfRecordView<'a> {
    pub chrom: &'a [u8],
    pub pos: i32,
    pub id: &'a [u8],
    pub reference: &'a [u8],
    pub alt: Vec<&'a [u8]>,
    pub qual: f32,
    pub filter: Vec<&'a [u8]>,
    pub info: Vec<&'a [u8]>,
    pub formats: Vec<&'a [u8]>,
    pub samples: Vec<Vec<&'a [u8]>>,
}

impl<'a> VcfRecordView<'a> {
    pub fn to_owned(&self) -> VcfRecord {
        fn owned_vec(v: &[&[u8]]) -> Vec<Vec<u8>> {
            v.iter().map(|s| s.to_vec()).collect()
        }
        VcfRecord {
            chrom: self.chrom.to_vec(),
            pos: self.pos,
            id: self.id.to_vec(),
            reference: self.reference.to_vec(),
            alt: owned_vec(&self.alt),
            qual: self.qual,
            filter: owned_vec(&self.filter),
            info: owned_vec(&self.info),
            formats: owned_vec(&self.formats),
            samples: self.samples.iter().map(|s| owned_vec(s)).collect(),
        }
    }
}

/// An owned copy of a [`VcfRecordView`], usable past the next `next()` call.
#[derive(Debug, Clone, PartialEq)]
pub struct VcfRecord {
    pub chrom: Vec<u8>,
    pub pos: i32,
    pub id: Vec<u8>,
    pub reference: Vec<u8>,
    pub alt: Vec<Vec<u8>>,
    pub qual: f32,
    pub filter: Vec<Vec<u8>>,
    pub info: Vec<Vec<u8>>,
    pub formats: Vec<Vec<u8>>,
    pub samples: Vec<Vec<Vec<u8>>>,
}

/// Streams VCF records out of a [`BufferedReader`], after consuming the
/// `##`-prefixed metadata lines and the `#CHROM...` column header.
///
/// The `*_ranges` fields are scratch storage for the byte ranges produced by
/// splitting `alt`/`filter`/`info`/`formats`/the per-sample columns: cleared
/// and refilled at the top of each [`next`][VcfReader::next] instead of
/// being freshly allocated, mirroring the reusable `std::vector<string_view>`
/// fields of the `storage` struct this is grounded on. The final borrowed
/// `Vec`s handed back in [`VcfRecordView`] are still built fresh each call —
/// Rust's borrow checker has no way to let a struct field hold a reference
/// into a sibling field of the same struct — but reusing the range scratch
/// avoids repeatedly reallocating the split bookkeeping itself, including
/// the per-sample vectors that used to be allocated one at a time.
pub struct VcfReader<S> {
    reader: BufferedReader<S>,
    cursor: usize,

    pub header: Vec<HeaderLine>,
    pub genotypes: Vec<String>,

    alt_ranges: Vec<(usize, usize)>,
    filter_ranges: Vec<(usize, usize)>,
    info_ranges: Vec<(usize, usize)>,
    formats_ranges: Vec<(usize, usize)>,
    sample_ranges: Vec<(usize, usize)>,
    sample_field_counts: Vec<usize>,
}

/// Pushes the byte ranges of `data` (absolute-positioned at `abs_start`)
/// split on `sep`, matching `[T]::split`'s behavior of yielding one segment
/// even when `sep` never occurs.
fn push_split_ranges(data: &[u8], abs_start: usize, sep: u8, out: &mut Vec<(usize, usize)>) {
    let mut start = 0usize;
    for (i, &b) in data.iter().enumerate() {
        if b == sep {
            out.push((abs_start + start, abs_start + i));
            start = i + 1;
        }
    }
    out.push((abs_start + start, abs_start + data.len()));
}

impl<S: ByteSource> VcfReader<S> {
    pub fn new(source: S) -> Result<Self> {
        let mut r = VcfReader {
            reader: BufferedReader::new(source),
            cursor: 0,
            header: Vec::new(),
            genotypes: Vec::new(),
            alt_ranges: Vec::new(),
            filter_ranges: Vec::new(),
            info_ranges: Vec::new(),
            formats_ranges: Vec::new(),
            sample_ranges: Vec::new(),
            sample_field_counts: Vec::new(),
        };
        r.read_header()?;
        Ok(r)
    }

    fn read_header_line(&mut self) -> Result<bool> {
        let window = self.reader.read(2)?;
        if window.len() >= 2 && window[0] == b'#' && window[1] == b'#' {
            let start = 2;
            let mid = self.reader.read_until(b'=', start)?;
            if self.reader.eof(mid) {
                return Ok(false);
            }
            let end = self.reader.read_until(b'\n', mid + 1)?;
            let key = String::from_utf8_lossy(self.reader.string_view(start, mid)).into_owned();
            let value = String::from_utf8_lossy(self.reader.string_view(mid + 1, end)).into_owned();
            self.header.push((key, value));
            if self.reader.eof(end) {
                return Ok(false);
            }
            self.reader.drop_until(end + 1);
            return Ok(true);
        }
        Ok(false)
    }

    fn read_header(&mut self) -> Result<()> {
        while self.read_header_line()? {}
        let window = self.reader.read(1)?;
        if !window.is_empty() && window[0] == b'#' {
            let start = 1;
            let end = self.reader.read_until(b'\n', start)?;
            let table_header = self.reader.string_view(start, end);
            let columns: Vec<String> = table_header
                .split(|&b| b == b'\t')
                .map(|f| String::from_utf8_lossy(f).into_owned())
                .collect();
            if columns.len() < 9 {
                return Err(SeqioError::MalformedHeader(
                    "column header line has fewer than 9 fixed columns",
                ));
            }
            self.genotypes = columns[9..].to_vec();
            self.reader.drop_until(end);
            if !self.reader.eof(end) {
                self.reader.drop_until(1);
            }
        }
        Ok(())
    }

    pub fn next(&mut self) -> Result<Option<VcfRecordView<'_>>> {
        if self.reader.eof(self.cursor) {
            return Ok(None);
        }
        self.reader.drop_until(self.cursor);
        self.cursor = 0;

        const FIELD_COUNT: usize = 10;
        let mut fields: [(usize, usize); FIELD_COUNT] = [(0, 0); FIELD_COUNT];
        let mut start = 0usize;
        for slot in fields.iter_mut().take(FIELD_COUNT - 1) {
            let end = self.reader.read_until(b'\t', start)?;
            if self.reader.eof(end) {
                return Ok(None);
            }
            *slot = (start, end);
            start = end + 1;
        }
        let end = self.reader.read_until(b'\n', start)?;
        if self.reader.eof(end) {
            return Ok(None);
        }
        fields[FIELD_COUNT - 1] = (start, end);

        self.cursor = if self.reader.eof(end) { end } else { end + 1 };

        // All byte ranges are resolved; every further access to `self.reader`
        // is immutable, so the returned view's lifetime ties to `&self` from
        // here on.
        let field = |i: usize| self.reader.string_view(fields[i].0, fields[i].1);
        let chrom = field(0);
        let pos_str = field(1);
        let id = field(2);
        let reference = field(3);
        let alt_str = field(4);
        let qual_str = field(5);
        let filter_str = field(6);
        let info_str = field(7);
        let formats_str = field(8);
        let samples_str = field(9);

        let pos: i32 = std::str::from_utf8(pos_str)
            .map_err(|_| SeqioError::Malformed("non-UTF8 POS field"))?
            .parse()?;
        let qual: f32 = std::str::from_utf8(qual_str)
            .map_err(|_| SeqioError::Malformed("non-UTF8 QUAL field"))?
            .parse()?;

        self.alt_ranges.clear();
        push_split_ranges(alt_str, fields[4].0, b',', &mut self.alt_ranges);
        let alt: Vec<&[u8]> = self
            .alt_ranges
            .iter()
            .map(|&(s, e)| self.reader.string_view(s, e))
            .collect();

        self.filter_ranges.clear();
        if filter_str != b"." {
            push_split_ranges(filter_str, fields[6].0, b';', &mut self.filter_ranges);
        }
        let filter: Vec<&[u8]> = self
            .filter_ranges
            .iter()
            .map(|&(s, e)| self.reader.string_view(s, e))
            .collect();

        self.info_ranges.clear();
        if info_str != b"." {
            push_split_ranges(info_str, fields[7].0, b';', &mut self.info_ranges);
        }
        let info: Vec<&[u8]> = self
            .info_ranges
            .iter()
            .map(|&(s, e)| self.reader.string_view(s, e))
            .collect();

        self.formats_ranges.clear();
        push_split_ranges(formats_str, fields[8].0, b':', &mut self.formats_ranges);
        let formats: Vec<&[u8]> = self
            .formats_ranges
            .iter()
            .map(|&(s, e)| self.reader.string_view(s, e))
            .collect();

        self.sample_ranges.clear();
        self.sample_field_counts.clear();
        let mut sample_start = fields[9].0;
        for sample in samples_str.split(|&b| b == b'\t') {
            let before = self.sample_ranges.len();
            push_split_ranges(sample, sample_start, b':', &mut self.sample_ranges);
            self.sample_field_counts
                .push(self.sample_ranges.len() - before);
            sample_start += sample.len() + 1;
        }
        let mut samples: Vec<Vec<&[u8]>> = Vec::with_capacity(self.sample_field_counts.len());
        let mut idx = 0;
        for &count in &self.sample_field_counts {
            let mut s = Vec::with_capacity(count);
            for &(a, b) in &self.sample_ranges[idx..idx + count] {
                s.push(self.reader.string_view(a, b));
            }
            idx += count;
            samples.push(s);
        }

        if !self.genotypes.is_empty() && samples.len() != self.genotypes.len() {
            #[cfg(feature = "log")]
            log::warn!(
                "VCF record has {} sample column(s), header declares {}",
                samples.len(),
                self.genotypes.len()
            );
        }

        Ok(Some(VcfRecordView {
            chrom,
            pos,
            id,
            reference,
            alt,
            qual,
            filter,
            info,
            formats,
            samples,
        }))
    }
}

impl<'a> VcfReader<AnySource<'a>> {
    pub fn open(config: Config<'a>) -> Result<Self> {
        VcfReader::new(open_source(config)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn reader_over(data: &[u8]) -> Result<VcfReader<std::io::Cursor<Vec<u8>>>> {
        VcfReader::new(std::io::Cursor::new(data.to_vec()))
    }

    #[test]
    fn parses_header_and_genotypes() -> anyhow::Result<()> {
        let r = reader_over(
            b"##fileformat=VCFv4.2\n##contig=<ID=chr1>\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tsample1\tsample2\n",
        )?;
        assert_eq!(r.header[0], ("fileformat".to_string(), "VCFv4.2".to_string()));
        assert_eq!(r.genotypes, vec!["sample1".to_string(), "sample2".to_string()]);
        Ok(())
    }

    #[test]
    fn rejects_short_column_header() {
        match reader_over(b"#CHROM\tPOS\tID\n") {
            Err(SeqioError::MalformedHeader(_)) => {}
            Err(other) => panic!("expected MalformedHeader, got {other:?}"),
            Ok(_) => panic!("expected MalformedHeader, got Ok"),
        }
    }

    #[test]
    fn parses_record_fields() -> anyhow::Result<()> {
        let mut r = reader_over(
            b"##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\ts1\ts2\nchr1\t100\trs1\tA\tC,G\t30.5\tPASS\tDP=10\tGT\t0/1\t1/1\n",
        )?;
        let rec = r.next()?.unwrap();
        assert_eq!(rec.chrom, b"chr1");
        assert_eq!(rec.pos, 100);
        assert_eq!(rec.id, b"rs1");
        assert_eq!(rec.reference, b"A");
        assert_eq!(rec.alt, vec![&b"C"[..], &b"G"[..]]);
        assert_eq!(rec.qual, 30.5f32);
        assert_eq!(rec.filter, vec![&b"PASS"[..]]);
        assert_eq!(rec.info, vec![&b"DP=10"[..]]);
        assert_eq!(rec.formats, vec![&b"GT"[..]]);
        assert_eq!(rec.samples.len(), 2);
        assert_eq!(rec.samples[0], vec![&b"0/1"[..]]);
        assert_eq!(rec.samples[1], vec![&b"1/1"[..]]);
        assert!(r.next()?.is_none());
        Ok(())
    }

    #[test]
    fn dot_sentinel_yields_empty_filter_and_info() -> anyhow::Result<()> {
        let mut r = reader_over(
            b"#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\ts1\nchr1\t1\t.\tA\tT\t30\t.\t.\tGT\t0/0\n",
        )?;
        let rec = r.next()?;
        let rec = rec.unwrap();
        assert!(rec.filter.is_empty());
        assert!(rec.info.is_empty());
        Ok(())
    }
}
