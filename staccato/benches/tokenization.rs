//! 小さなモデルを使った形態素解析のベンチマーク
//!
//! その場で学習した小さなパターンモデルで解析ループの速度を計測します。

use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use staccato::{Model, PatternBuilder, Tagger};

const CORPUS: &str = "吾\t名詞,普通名詞,*,*,吾,われ
輩\t接尾辞,名詞性名詞接尾辞,*,*,輩,はい
は\t助詞,副助詞,*,*,は,は
猫\t名詞,普通名詞,*,*,猫,ねこ
で\t判定詞,*,判定詞,ダ列基本連用形,だ,で
ある\t接尾辞,動詞性接尾辞,母音動詞,基本形,ある,ある
EOS
名前\t名詞,普通名詞,*,*,名前,なまえ
は\t助詞,副助詞,*,*,は,は
まだ\t副詞,*,*,*,まだ,まだ
無い\t形容詞,*,イ形容詞アウオ段,基本形,無い,ない
EOS
";

fn bench_tagging(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("Failed to create a temporary directory");
    let mut builder = PatternBuilder::new();
    builder
        .extract_from_readers(CORPUS.as_bytes(), Vec::<&[u8]>::new())
        .expect("Failed to extract patterns");
    builder
        .write_patterns(dir.path())
        .expect("Failed to write the model");

    let input = "吾輩は猫である。名前はまだ無い。カタカナ123abc\n".repeat(1000);
    let total_bytes = input.len();

    let mut group = c.benchmark_group("Tagging Speed");
    group.throughput(Throughput::Bytes(total_bytes as u64));
    group.warm_up_time(Duration::from_secs(3));
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("Tagging", |b| {
        let tagger = Tagger::new(Model::read(dir.path()).expect("Failed to read the model"));
        b.iter(|| {
            let mut out = Vec::with_capacity(total_bytes * 4);
            tagger.run(input.as_bytes(), &mut out).expect("Analysis failed");
            out
        });
    });

    group.bench_function("Segmentation", |b| {
        let tagger = Tagger::new(Model::read(dir.path()).expect("Failed to read the model"))
            .segmentation(true);
        b.iter(|| {
            let mut out = Vec::with_capacity(total_bytes * 2);
            tagger.run(input.as_bytes(), &mut out).expect("Analysis failed");
            out
        });
    });

    group.finish();
}

criterion_group!(benches, bench_tagging);
criterion_main!(benches);
