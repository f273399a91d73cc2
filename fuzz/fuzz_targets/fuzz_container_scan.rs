#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

use lifscan::reader::{Coordinates, LifReader, ReaderConfig};

fuzz_target!(|data: &[u8]| {
    // Indexing must either succeed or fail with an error, never panic
    let quick = data.first().map(|b| b & 1 == 0).unwrap_or(true);
    let config = ReaderConfig::default().with_quick(quick);
    let Ok(mut reader) = LifReader::from_reader(Cursor::new(data), config) else {
        return;
    };

    // Exercise the pixel paths of every series that has a payload
    for i in 0..reader.series_count() {
        let _ = reader.describe_series(i);
        if let Ok(mut series) = reader.series(i) {
            let _ = series.read_plane(&Coordinates::new());
        }
        if let Ok(series) = reader.series(i) {
            for frame in series.frames().take(4) {
                if frame.is_err() {
                    break;
                }
            }
        }
        if let Ok(series) = reader.series(i) {
            let _ = series.slices().take(4).count();
        }
    }
});
