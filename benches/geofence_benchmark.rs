use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fleet_tracker::models::{FenceBoundary, FencePolicy, Geofence};
use geo::{polygon, Point};
use uuid::Uuid;

/// Build a synthetic fence grid around Sydney: `count` square fences,
/// each ~1 km across, tiled in rows of 20.
fn build_fences(count: usize) -> Vec<Geofence> {
    (0..count)
        .map(|i| {
            let lat = -34.0 + (i % 20) as f64 * 0.02;
            let lng = 150.5 + (i / 20) as f64 * 0.02;
            let d = 0.005;
            Geofence {
                id: Uuid::new_v4(),
                company_id: Uuid::new_v4(),
                name: format!("Fence {}", i),
                location_type: "DEPOT".to_string(),
                boundary: FenceBoundary::Polygon(polygon![
                    (x: lng - d, y: lat - d),
                    (x: lng + d, y: lat - d),
                    (x: lng + d, y: lat + d),
                    (x: lng - d, y: lat + d),
                    (x: lng - d, y: lat - d),
                ]),
                policy: FencePolicy::Inclusion,
                demurrage_enabled: false,
                free_time_hours: 0.0,
                demurrage_rate_per_hour: None,
                is_active: true,
            }
        })
        .collect()
}

fn sweep(fences: &[Geofence], point: &Point<f64>) -> usize {
    fences.iter().filter(|f| f.is_presence(point)).count()
}

fn benchmark_containment_sweep(c: &mut Criterion) {
    let fences = build_fences(200);

    // A point inside one of the fences
    let inside = Point::new(150.5, -34.0);
    // Nevada: complex sweep input far from every fence
    let far_away = Point::new(-116.0, 38.0);

    let mut group = c.benchmark_group("containment_sweep");

    group.bench_function("point_inside_fence_grid", |b| {
        b.iter(|| sweep(black_box(&fences), black_box(&inside)))
    });

    group.bench_function("point_far_from_all_fences", |b| {
        b.iter(|| sweep(black_box(&fences), black_box(&far_away)))
    });

    group.finish();
}

criterion_group!(benches, benchmark_containment_sweep);
criterion_main!(benches);
