use std::{collections::BTreeMap, hint::black_box, time::Instant};

use gnuplot::{
    AlignType, AutoOption, Axes2D, AxesCommon, Coordinate, Figure, LegendOption, PlotOption, Tick,
};
use rbmap::{rand, Map};

const N: usize = 16;
const XS: [usize; N] = const {
    let mut xs = [0; N];
    let (mut i, mut x) = (0, 2);
    while i < N {
        xs[i] = x;
        x *= 2;
        i += 1;
    }
    xs
};

/// The operations being timed, over any ordered map.
trait Workload {
    const NAME: &'static str;

    fn run(keys: &[i32], lookups: &[i32]) -> usize;
}

struct RedBlack;

impl Workload for RedBlack {
    const NAME: &'static str = "rbmap::Map";

    fn run(keys: &[i32], lookups: &[i32]) -> usize {
        let mut map = Map::new();
        for &key in keys {
            map.insert(key, key);
        }
        let hits = lookups.iter().filter(|key| map.contains_key(key)).count();
        for key in lookups {
            map.remove(key);
        }
        hits + map.len()
    }
}

struct Stdlib;

impl Workload for Stdlib {
    const NAME: &'static str = "std BTreeMap";

    fn run(keys: &[i32], lookups: &[i32]) -> usize {
        let mut map = BTreeMap::new();
        for &key in keys {
            map.insert(key, key);
        }
        let hits = lookups.iter().filter(|key| map.contains_key(key)).count();
        for key in lookups {
            map.remove(key);
        }
        hits + map.len()
    }
}

fn plot<W: Workload>(keys: &[i32], lookups: &[i32], axes: &mut Axes2D) {
    let ys = XS.map(|x| {
        let before = Instant::now();
        black_box(W::run(&keys[..x], &lookups[..x]));
        before.elapsed().as_nanos() as u64
    });
    axes.lines_points(
        XS,
        ys,
        &[
            PlotOption::LineWidth(2.0),
            PlotOption::PointSize(2.0),
            PlotOption::Caption(W::NAME),
        ],
    );
}

fn main() {
    let keys = rand::distinct(XS[N - 1]);
    let mut lookups = keys.clone();
    rand::shuffle(&mut lookups);

    let mut figure = Figure::new();
    figure.set_title("Insert, find and remove");

    let x_ticks = (1..)
        .map(|x| Tick::Major(2f32.powi(x), AutoOption::<f32>::Auto))
        .take(N);
    let y_ticks = (1..)
        .zip([
            "10ns", "100ns", "1µs", "10µs", "100µs", "1ms", "10ms", "100ms", "1s", "10s", "100s",
        ])
        .map(|(y, label)| Tick::Major(10f32.powi(y), AutoOption::Fix(label)));

    let axes = figure
        .axes2d()
        .set_legend(
            Coordinate::Graph(0.05),
            Coordinate::Graph(0.95),
            &[LegendOption::Placement(
                AlignType::AlignLeft,
                AlignType::AlignTop,
            )],
            &[],
        )
        .set_x_grid(true)
        .set_x_label("Entries", &[])
        .set_x_ticks_custom(x_ticks, &[], &[])
        .set_x_log(Some(2.0))
        .set_y_grid(true)
        .set_y_label("Time (ns)", &[])
        .set_y_ticks_custom(y_ticks, &[], &[])
        .set_y_log(Some(10.0));

    plot::<RedBlack>(&keys, &lookups, axes);
    plot::<Stdlib>(&keys, &lookups, axes);

    figure.show().unwrap();
}
