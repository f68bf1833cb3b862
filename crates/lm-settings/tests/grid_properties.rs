//! Load/save properties of the settings grid

use lm_settings::{Grid, RuleRange};
use proptest::prelude::*;

fn cell() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), "[a-c]{1,2}"]
}

fn arb_grid() -> impl Strategy<Value = Grid> {
    (1..6usize, 0..8usize).prop_flat_map(|(width, data_rows)| {
        let header = proptest::collection::vec(prop_oneof![Just(String::new()), "[A-D]"], 0..=width);
        let fixed = proptest::collection::vec(proptest::collection::vec(cell(), 0..=width), 2);
        let data = proptest::collection::vec(
            ("[a-z][0-9]", proptest::collection::vec(cell(), 0..width)).prop_map(|(id, mut rest)| {
                rest.insert(0, id);
                rest
            }),
            data_rows,
        );
        (header, fixed, data).prop_map(|(header, fixed, data)| {
            let mut grid = vec![header];
            grid.extend(fixed);
            grid.extend(data);
            grid
        })
    })
}

proptest! {
    #[test]
    fn prop_load_save_is_idempotent(grid in arb_grid()) {
        let first = RuleRange::from_grid(&grid).recompose(None);
        let second = RuleRange::from_grid(&first).recompose(None);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_sections_stay_aligned(grid in arb_grid()) {
        let mut range = RuleRange::from_grid(&grid);
        let out = range.recompose(None);

        let ids: Vec<String> = grid
            .iter()
            .skip(3)
            .filter_map(|row| row.first().cloned())
            .collect();
        for id in ids {
            let row_no = range.row_index().grid_row(&id).expect("indexed");
            let row = &out[row_no];
            prop_assert_eq!(&row[0], &id);

            let mut offset = 0;
            for section in range.sections() {
                let width = section.width();
                prop_assert_eq!(&row[offset..offset + width], section.row(&id).expect("row"));
                offset += width;
            }
        }
    }

    #[test]
    fn prop_row_count_matches_index(grid in arb_grid()) {
        let mut range = RuleRange::from_grid(&grid);
        let out = range.recompose(None);
        prop_assert_eq!(out.len(), range.row_index().len() + 2);
        let width = out[0].len();
        prop_assert!(out.iter().all(|row| row.len() == width));
    }
}
