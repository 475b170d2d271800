use approx::assert_relative_eq;
use cdm_array::{Array, ArrayError, DataType, Index, Range, Section, TypedArray, Value};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn make_array(shape: &[usize]) -> Array {
    let n: usize = shape.iter().product();
    Array::linear(DataType::Double, n, 0.0, 1.0)
        .unwrap()
        .reshape(shape)
        .unwrap()
}

fn random_shape(rng: &mut StdRng) -> Vec<usize> {
    let rank = rng.gen_range(1..=4);
    (0..rank).map(|_| rng.gen_range(1..=5)).collect()
}

fn random_index(rng: &mut StdRng, shape: &[usize]) -> Vec<usize> {
    shape.iter().map(|&n| rng.gen_range(0..n)).collect()
}

#[test]
fn test_size_is_product_of_shape() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..50 {
        let shape = random_shape(&mut rng);
        let a = Array::zeros(DataType::Int, &shape);
        assert_eq!(a.size(), shape.iter().product::<usize>());
        assert_eq!(a.rank(), shape.len());
    }
    let scalar = Array::zeros(DataType::Double, &[]);
    assert_eq!(scalar.rank(), 0);
    assert_eq!(scalar.size(), 1);
    assert_eq!(Index::scalar().size(), 1);
}

#[test]
fn test_set_then_get() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..50 {
        let shape = random_shape(&mut rng);
        let a = Array::zeros(DataType::Double, &shape);
        let idx = random_index(&mut rng, &shape);
        let v: f64 = rng.gen_range(-100.0..100.0);
        a.set_double(&idx, v).unwrap();
        assert_relative_eq!(a.get_double(&idx).unwrap(), v, epsilon = 1e-12);
    }
}

#[test]
fn test_element_access_bounds() {
    let a = make_array(&[2, 3]);
    assert!(matches!(
        a.get_double(&[2, 0]),
        Err(ArrayError::IndexOutOfBounds { .. })
    ));
    assert!(matches!(
        a.get_double(&[1]),
        Err(ArrayError::IndexOutOfBounds { .. })
    ));
    assert!(a.set_double(&[0, 3], 1.0).is_err());
    assert_eq!(a.get_double(&[0, 2]).unwrap(), 2.0);
}

#[test]
fn test_copy_is_equal_and_independent() {
    let a = make_array(&[3, 4]);
    let view = a.permute(&[1, 0]).unwrap();
    let c = view.copy().unwrap();
    assert!(c.index().is_fast());
    assert_eq!(c.to_values(), view.to_values());
    assert!(!c.shares_storage_with(&a));

    c.set_double(&[0, 0], -5.0).unwrap();
    assert_eq!(a.get_double(&[0, 0]).unwrap(), 0.0);
}

#[test]
fn test_unsigned_widening() {
    let a = Array::from_vec(&[3], vec![0xFFu8, 0x7F, 0x80]).unwrap();
    assert_eq!(a.get_double(&[0]).unwrap(), 255.0);
    assert_eq!(a.get_long(&[2]).unwrap(), 128);

    let us = Array::from_vec(&[1], vec![0xFFFFu16]).unwrap();
    assert_eq!(us.get_int(&[0]).unwrap(), 65535);
    assert_eq!(us.get_object(&[0]).unwrap().widen_unsigned(), Value::Int(65535));
}

#[test]
fn test_forbidden_conversions() {
    let b = Array::from_vec(&[2], vec![true, false]).unwrap();
    assert!(matches!(
        b.get_double(&[0]),
        Err(ArrayError::ForbiddenConversion { .. })
    ));
    let d = Array::zeros(DataType::Double, &[2]);
    assert!(matches!(
        d.get_boolean(&[0]),
        Err(ArrayError::ForbiddenConversion { .. })
    ));
    let o = Array::zeros(DataType::Opaque, &[1]);
    assert!(o.get_int(&[0]).is_err());
    o.set_opaque(&[0], vec![1, 2, 3]).unwrap();
    assert_eq!(o.get_opaque(&[0]).unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_section_spec_parse_fill_and_apply() {
    let s: Section = "(1:3,:,2)".parse().unwrap();
    assert_eq!(s.rank(), 3);
    assert_eq!(s.range(0), Some(&Range::new(1, 3, 1).unwrap()));
    assert_eq!(s.range(1), None);
    assert_eq!(s.range(2), Some(&Range::new(2, 2, 1).unwrap()));

    let filled = Section::fill(Some(&s), &[5, 5, 5]).unwrap();
    assert_eq!(filled.shape().unwrap(), vec![3, 5, 1]);

    let a = make_array(&[5, 5, 5]);
    let v = a.section(&s).unwrap();
    assert_eq!(v.rank(), 2);
    assert_eq!(v.shape(), &[3, 5]);
}

#[test]
fn test_section_spec_errors() {
    assert!(matches!(
        "(1:x,:)".parse::<Section>(),
        Err(ArrayError::IllegalSelector { .. })
    ));
    assert!(matches!(
        "1:2:3:4".parse::<Section>(),
        Err(ArrayError::IllegalSelector { .. })
    ));
    assert!(matches!(
        "(3:1)".parse::<Section>(),
        Err(ArrayError::InvalidRange(_))
    ));

    let a = make_array(&[2, 2]);
    let too_far: Section = "(0:2,:)".parse().unwrap();
    assert!(matches!(a.section(&too_far), Err(ArrayError::InvalidRange(_))));
    let wrong_rank: Section = "(0,0,0)".parse().unwrap();
    assert!(a.section(&wrong_rank).is_err());
}

#[test]
fn test_transpose_get() {
    let a = make_array(&[2, 3]);
    assert_eq!(a.get_double(&[1, 2]).unwrap(), 5.0);
    let t = a.transpose(0, 1).unwrap();
    assert_eq!(t.get_double(&[2, 1]).unwrap(), 5.0);
    assert_eq!(t.to_string(), "0 3 1 4 2 5");
}

#[test]
fn test_section_display_round_trip() {
    for text in ["1:3,:,2:2", "0:8:2,4:4", ":", "0:0,1:4:3,:"] {
        let s: Section = text.parse().unwrap();
        assert_eq!(s.to_string(), text);
        let again: Section = s.to_string().parse().unwrap();
        assert_eq!(again, s);
    }
    let named = Range::named("time", 0, 9, 3).unwrap();
    assert_eq!(named.to_string(), "0:9:3");
}

#[test]
fn test_construction_api() {
    let c = Array::constant(DataType::Int, &[2, 2], Value::Int(4)).unwrap();
    assert_eq!(c.to_string(), "4 4 4 4");

    let p = Array::parse_values(DataType::Float, &["1.5", "-2"]).unwrap();
    assert_relative_eq!(p.get_float(&[0]).unwrap(), 1.5f32);
    assert_relative_eq!(p.get_double(&[1]).unwrap(), -2.0);

    let v = Array::from_values(
        DataType::Short,
        &[3],
        vec![Value::Byte(-1), Value::UByte(200), Value::Double(3.7)],
    )
    .unwrap();
    assert_eq!(v.to_string(), "-1 200 3");

    let t = TypedArray::from_fn(&[2, 2], |idx| (idx[0] * 2 + idx[1]) as u32);
    let wrapped: Array = t.into();
    assert_eq!(wrapped.data_type(), DataType::UInt);
    assert_eq!(wrapped.get_long(&[1, 1]).unwrap(), 3);
}

#[test]
fn test_strided_record_field() {
    // Three records of (i32, i32, i32); pull out the middle field.
    let storage = cdm_array::Storage::new((0..9).collect::<Vec<i32>>());
    let field = Index::with_strides(&[3], &[3], 1).unwrap();
    let column: Array = TypedArray::from_parts(storage, field).unwrap().into();
    let copied = column.copy().unwrap();
    assert_eq!(copied.to_string(), "1 4 7");

    let mut it = column.index_iterator();
    let mut sum = 0;
    while it.has_next() {
        sum += it.get_int_next().unwrap();
    }
    assert_eq!(sum, 12);
}

#[test]
fn test_string_and_char_arrays() {
    let s = Array::parse_values(DataType::String, &["alpha", "beta"]).unwrap();
    assert_eq!(s.to_string(), "alpha beta");
    s.set_string(&[1], "gamma".to_string()).unwrap();
    assert_eq!(s.get_object(&[1]).unwrap(), Value::from("gamma"));

    let c = Array::parse_values(DataType::Char, &["a", "b"]).unwrap();
    assert_eq!(c.get_int(&[1]).unwrap(), 98);
    assert!(Array::parse_values(DataType::Char, &["ab"]).is_err());
}
