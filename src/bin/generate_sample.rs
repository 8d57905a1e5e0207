use std::sync::Arc;

use arrow::array::{Date32Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Days, NaiveDate};
use parquet::arrow::ArrowWriter;

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

struct Sale {
    date: NaiveDate,
    region: &'static str,
    product: &'static str,
    quantity: i64,
    amount: f64,
}

fn main() {
    let mut rng = SimpleRng::new(42);

    let start = NaiveDate::from_ymd_opt(2023, 1, 1).expect("valid start date");
    let regions = ["华东", "华南", "华北"];
    // (product, unit price, mean daily quantity)
    let products = [("钢笔", 12.5, 30.0), ("墨水", 4.0, 55.0), ("笔记本", 8.0, 40.0)];

    let mut sales = Vec::new();
    for day in 0..90u64 {
        let date = start + Days::new(day);
        for (r, region) in regions.into_iter().enumerate() {
            for &(product, price, mean_qty) in &products {
                // A few gaps so some (date, region) combinations are missing.
                if rng.next_f64() < 0.05 {
                    continue;
                }
                let seasonal = 1.0 + 0.2 * (day as f64 / 14.0).sin() + 0.1 * r as f64;
                let quantity = rng.gauss(mean_qty * seasonal, mean_qty * 0.15).round().max(0.0) as i64;
                sales.push(Sale {
                    date,
                    region,
                    product,
                    quantity,
                    amount: (quantity as f64 * price * 100.0).round() / 100.0,
                });
            }
        }
    }

    // Write CSV
    let csv_path = "sample_sales.csv";
    let mut writer = csv::Writer::from_path(csv_path).expect("Failed to create CSV");
    writer
        .write_record(["日期", "地区", "产品", "销量", "金额"])
        .expect("Failed to write header");
    for s in &sales {
        writer
            .write_record([
                s.date.format("%Y-%m-%d").to_string(),
                s.region.to_string(),
                s.product.to_string(),
                s.quantity.to_string(),
                s.amount.to_string(),
            ])
            .expect("Failed to write row");
    }
    writer.flush().expect("Failed to flush CSV");

    // Build Arrow arrays
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid epoch");
    let date_array = Date32Array::from(
        sales
            .iter()
            .map(|s| (s.date - epoch).num_days() as i32)
            .collect::<Vec<_>>(),
    );
    let region_array = StringArray::from(sales.iter().map(|s| s.region).collect::<Vec<_>>());
    let product_array = StringArray::from(sales.iter().map(|s| s.product).collect::<Vec<_>>());
    let quantity_array = Int64Array::from(sales.iter().map(|s| s.quantity).collect::<Vec<_>>());
    let amount_array = Float64Array::from(sales.iter().map(|s| s.amount).collect::<Vec<_>>());

    let schema = Arc::new(Schema::new(vec![
        Field::new("日期", DataType::Date32, false),
        Field::new("地区", DataType::Utf8, false),
        Field::new("产品", DataType::Utf8, false),
        Field::new("销量", DataType::Int64, false),
        Field::new("金额", DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(date_array),
            Arc::new(region_array),
            Arc::new(product_array),
            Arc::new(quantity_array),
            Arc::new(amount_array),
        ],
    )
    .expect("Failed to create RecordBatch");

    // Write Parquet
    let parquet_path = "sample_sales.parquet";
    let file = std::fs::File::create(parquet_path).expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");

    println!(
        "Wrote {} sales rows to {csv_path} and {parquet_path}",
        sales.len()
    );
}
