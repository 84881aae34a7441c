use chrono::{Duration, Utc};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{Money, PricingConfig, Product, Promotion, PromotionKind, PromotionTarget};
use std::hint::black_box;

fn catalog(size: usize) -> Vec<Product> {
    let sale_end = Utc::now() + Duration::days(1);
    (0..size)
        .map(|i| {
            let product = Product::new(
                format!("Product {i}"),
                format!("product-{i}"),
                Money::thousands(100 + i as i64),
                1_000,
                250,
            );
            if i % 3 == 0 {
                product.with_sale(Money::thousands(90 + i as i64), sale_end)
            } else {
                product
            }
        })
        .collect()
}

fn bench_price_lines(c: &mut Criterion) {
    let products = catalog(50);
    let now = Utc::now();

    c.bench_function("pricing/price_50_lines", |b| {
        b.iter(|| {
            let lines = products.iter().map(|p| (p, 2));
            black_box(domain::price_lines(lines, now))
        });
    });
}

fn bench_points_earned(c: &mut Criterion) {
    let config = PricingConfig::default();

    c.bench_function("pricing/points_earned", |b| {
        b.iter(|| domain::points_earned(black_box(Money::new(123_456_789)), &config));
    });
}

fn bench_promotion_discount(c: &mut Criterion) {
    let mut promotion = Promotion::new("SALE10", PromotionKind::Percent, PromotionTarget::Product, 10);
    promotion.max_value = Some(Money::thousands(200));
    let now = Utc::now();

    c.bench_function("pricing/promotion_discount", |b| {
        b.iter(|| {
            let usable = domain::promotion::resolve(Some(&promotion), now);
            black_box(usable.map(|p| p.discount_for(black_box(Money::millions(3)))))
        });
    });
}

criterion_group!(
    benches,
    bench_price_lines,
    bench_points_earned,
    bench_promotion_discount,
);
criterion_main!(benches);
