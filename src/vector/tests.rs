use super::*;

#[test]
fn new_rejects_wrong_dimension() {
    let result = Vector::new(vec![1.0, 2.0, 3.0], 4);
    assert!(matches!(
        result,
        Err(IndexError::DimensionMismatch {
            expected: 4,
            actual: 3
        })
    ));

    assert!(Vector::new(vec![1.0, 2.0, 3.0, 4.0], 4).is_ok());
}

#[test]
fn normalize_produces_unit_length() {
    let vector = Vector::from(vec![3.0, 4.0]).normalized();
    assert!((vector.as_slice()[0] - 0.6).abs() < 1e-6);
    assert!((vector.as_slice()[1] - 0.8).abs() < 1e-6);
    assert!(vector.is_unit());
}

#[test]
fn normalize_leaves_zero_vector_alone() {
    let vector = Vector::zeros(8).normalized();
    assert!(vector.is_zero());
    assert!(vector.as_slice().iter().all(|v| *v == 0.0));
    assert!(!vector.is_unit());
}

#[test]
fn dot_of_basis_vectors() {
    let e0 = Vector::basis(4, 0);
    let e1 = Vector::basis(4, 1);
    assert_eq!(e0.dot(&e0), 1.0);
    assert_eq!(e0.dot(&e1), 0.0);
}

#[test]
fn basis_out_of_range_is_zero() {
    let vector = Vector::basis(3, 7);
    assert!(vector.is_zero());
    assert_eq!(vector.dimension(), 3);
}

#[test]
fn byte_codec_preserves_values() {
    let vector = Vector::from(vec![0.25, -1.5, 3.0e-7, f32::MAX]);
    let decoded = Vector::from_bytes(&vector.to_bytes()).expect("should decode");
    assert_eq!(decoded, vector);
    assert_eq!(vector.to_bytes().len(), 16);
}

#[test]
fn from_bytes_rejects_truncated_blob() {
    let result = Vector::from_bytes(&[0, 0, 128]);
    assert!(matches!(result, Err(IndexError::StoreUnavailable(_))));
}
