use jetrow::{
    Cell, CellError, DataCell, Formula, RowOptions, RowStream, StreamOptions, StyleId,
    StyledCell, WriteError, MIN_BUFFER_SIZE,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::AsyncWrite;

/// Records the size of every write it receives.
#[derive(Default)]
struct RecordingSink {
    data: Vec<u8>,
    writes: Vec<usize>,
}

impl AsyncWrite for RecordingSink {
    fn poll_write(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.data.extend_from_slice(buf);
        self.writes.push(buf.len());
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

async fn write_rows<C: jetrow::RowCell>(rows: &[Vec<C>], options: StreamOptions) -> String {
    let mut stream = RowStream::new(Vec::new(), options).unwrap();
    for cells in rows {
        stream.add_row(cells).await.unwrap();
    }
    String::from_utf8(stream.finish().await.unwrap()).unwrap()
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

/// Reverses the escaping applied to inline strings.
fn unescape(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len());
    let mut rest = xml;
    while let Some(i) = rest.find(['&', '_']) {
        out.push_str(&rest[..i]);
        rest = &rest[i..];
        let entity = [
            ("&amp;", '&'),
            ("&lt;", '<'),
            ("&gt;", '>'),
            ("&quot;", '"'),
            ("&apos;", '\''),
        ]
        .into_iter()
        .find(|(e, _)| rest.starts_with(e));
        if let Some((e, c)) = entity {
            out.push(c);
            rest = &rest[e.len()..];
        } else if rest.starts_with("_x") && rest.len() >= 7 && rest.as_bytes()[6] == b'_' {
            let code = u32::from_str_radix(&rest[2..6], 16).unwrap();
            out.push(char::from_u32(code).unwrap());
            rest = &rest[7..];
        } else {
            out.push_str(&rest[..1]);
            rest = &rest[1..];
        }
    }
    out.push_str(rest);
    out
}

fn inline_text(row: &str) -> &str {
    let start = row.find("<t>").unwrap() + 3;
    let end = row.rfind("</t>").unwrap();
    &row[start..end]
}

#[tokio::test]
async fn test_scenario_row() {
    let rows = vec![vec![DataCell::from(42), DataCell::from("Nordmann"), DataCell::from(true)]];
    assert_eq!(
        write_rows(&rows, StreamOptions::default()).await,
        "<row r=\"1\"><c><v>42</v></c>\
         <c t=\"inlineStr\"><is><t>Nordmann</t></is></c>\
         <c t=\"b\"><v>1</v></c></row>"
    );
}

#[tokio::test]
async fn test_string_far_larger_than_buffer() {
    let text = "Spreadsheet <&> \"quoted\" ".repeat(40_000);
    let rows = vec![vec![DataCell::from(1), DataCell::from(text.as_str()), DataCell::from(2)]];
    let out = write_rows(&rows, StreamOptions::default().with_buffer_size(MIN_BUFFER_SIZE)).await;

    let escaped = text
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;");
    assert_eq!(
        out,
        format!(
            "<row r=\"1\"><c><v>1</v></c><c t=\"inlineStr\"><is><t>{escaped}</t></is></c>\
             <c><v>2</v></c></row>"
        )
    );
}

#[tokio::test]
async fn test_plain_string_of_several_mebibytes() {
    let text = "a".repeat(4 << 20);
    let rows = vec![vec![DataCell::from(text.as_str()), DataCell::from(true)]];
    let out = write_rows(&rows, StreamOptions::default().with_buffer_size(MIN_BUFFER_SIZE)).await;
    assert!(out == format!(
        "<row r=\"1\"><c t=\"inlineStr\"><is><t>{text}</t></is></c>\
         <c t=\"b\"><v>1</v></c></row>"
    ));
}

#[tokio::test]
async fn test_flushes_only_when_the_buffer_is_full() {
    let size = MIN_BUFFER_SIZE;
    let rows: Vec<Vec<DataCell>> = (0..20)
        .map(|r| {
            vec![
                DataCell::from(r as i64),
                DataCell::from("p".repeat(300 + r * 37)),
                DataCell::from(r as f64 + 0.25),
                DataCell::from("x<y & z ".repeat(r * 20)),
                DataCell::from("q".repeat(2_000 + r)),
                DataCell::Blank,
            ]
        })
        .collect();

    let options = StreamOptions::default().with_buffer_size(size);
    let mut stream = RowStream::new(RecordingSink::default(), options).unwrap();
    for cells in &rows {
        stream.add_row(cells).await.unwrap();
    }
    let sink = stream.finish().await.unwrap();

    let unbounded = write_rows(&rows, StreamOptions::default().with_buffer_size(1 << 22)).await;
    assert!(sink.data == unbounded.as_bytes());

    assert!(sink.writes.iter().all(|&n| n > 0 && n <= size));
    // Each flush happened because the next fragment did not fit, and that
    // fragment opens the following write.
    for pair in sink.writes.windows(2) {
        assert!(pair[0] + pair[1] > size, "wasted flush in {:?}", sink.writes);
    }
    assert!(sink.writes.len() <= 2 * sink.data.len() / size + 1);
}

#[tokio::test]
async fn test_each_row_opens_and_closes_once() {
    let rows: Vec<Vec<DataCell>> = (0..200)
        .map(|r| (0..r % 7).map(|c| DataCell::from(format!("r{r}c{c}"))).collect())
        .collect();
    let out = write_rows(&rows, StreamOptions::default().with_buffer_size(600)).await;

    assert_eq!(out.matches("<row ").count(), 200);
    assert_eq!(out.matches("</row>").count(), 200);
    for (r, row) in out.split_inclusive("</row>").enumerate() {
        assert!(row.starts_with(&format!("<row r=\"{}\">", r + 1)));
        let mut last = 0;
        for c in 0..r % 7 {
            let at = row.find(&format!(">r{r}c{c}<")).unwrap();
            assert!(at >= last);
            last = at;
        }
    }
}

#[tokio::test]
async fn test_formulas_through_stream() {
    let rows = vec![vec![
        Cell::formula(Formula::new("SUM(A2:A9)").with_cached(36.5)),
        Cell::formula(Formula::new("A1&\"!\"").with_cached("36.5!")),
        Cell::formula(Formula::new("1/0").with_cached(CellError::DivisionByZero)),
        Cell::formula(Formula::new("TODAY()")).with_style(StyleId(2)),
    ]];
    assert_eq!(
        write_rows(&rows, StreamOptions::default()).await,
        "<row r=\"1\"><c><f>SUM(A2:A9)</f><v>36.5</v></c>\
         <c t=\"str\"><f>A1&amp;&quot;!&quot;</f><v>36.5!</v></c>\
         <c t=\"e\"><f>1/0</f><v>#DIV/0!</v></c>\
         <c s=\"2\"><f>TODAY()</f></c></row>"
    );
}

#[tokio::test]
async fn test_huge_formula_with_huge_cached_text() {
    let formula = Formula::new(format!("\"{}\"", "q".repeat(5_000))).with_cached("v".repeat(5_000));
    let rows = vec![vec![Cell::formula(formula)]];
    let small = write_rows(&rows, StreamOptions::default().with_buffer_size(512)).await;
    let large = write_rows(&rows, StreamOptions::default()).await;
    assert_eq!(small, large);
    assert!(small.ends_with("vvvv</v></c></row>"));
}

#[tokio::test]
async fn test_sparse_styled_rows() {
    let options = StreamOptions::default().with_cell_references(true);
    let mut stream = RowStream::new(Vec::new(), options).unwrap();
    let row_options = RowOptions::default().with_height(30.0);
    stream
        .add_row_at(2, &[StyledCell::new(5, Some(StyleId(1)))], Some(&row_options))
        .await
        .unwrap();
    stream
        .add_row_at(10, &[StyledCell::new(DataCell::Blank, None), StyledCell::new("x", None)], None)
        .await
        .unwrap();
    assert!(matches!(
        stream.add_row_at(10, &[StyledCell::default()], None).await,
        Err(WriteError::Validation(_))
    ));

    assert_eq!(
        String::from_utf8(stream.finish().await.unwrap()).unwrap(),
        "<row r=\"2\" ht=\"30\" customHeight=\"1\"><c r=\"A2\" s=\"1\"><v>5</v></c></row>\
         <row r=\"10\"><c r=\"A10\"/><c r=\"B10\" t=\"inlineStr\"><is><t>x</t></is></c></row>"
    );
}

fn cell_strategy() -> impl Strategy<Value = DataCell> {
    prop_oneof![
        Just(DataCell::Blank),
        any::<i64>().prop_map(DataCell::Integer),
        any::<f64>().prop_map(DataCell::Number),
        any::<bool>().prop_map(DataCell::Boolean),
        ".{0,700}".prop_map(DataCell::Text),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_string_round_trips_at_any_buffer_size(
        text in "[^_]{0,3000}",
        size in MIN_BUFFER_SIZE..2048usize,
    ) {
        let rows = vec![vec![DataCell::from(text.as_str())]];
        let out = block_on(write_rows(&rows, StreamOptions::default().with_buffer_size(size)));
        prop_assert_eq!(unescape(inline_text(&out)), text);
    }

    #[test]
    fn prop_resumed_rows_match_unbounded_write(
        rows in prop::collection::vec(prop::collection::vec(cell_strategy(), 0..12), 1..8),
        size in MIN_BUFFER_SIZE..1500usize,
    ) {
        let bounded = block_on(write_rows(&rows, StreamOptions::default().with_buffer_size(size)));
        let unbounded = block_on(write_rows(&rows, StreamOptions::default().with_buffer_size(1 << 22)));
        prop_assert_eq!(bounded, unbounded);
    }
}
