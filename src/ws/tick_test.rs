use super::*;

#[test]
fn ticks_per_second_caps_at_twenty() {
    assert_eq!(ticks_per_second(10.0), 20.0);
    assert_eq!(ticks_per_second(50.0), 20.0);
    assert_eq!(ticks_per_second(0.001), 20.0);
}

#[test]
fn ticks_per_second_rounds_to_one_decimal() {
    assert_eq!(ticks_per_second(60.0), 16.7);
    assert_eq!(ticks_per_second(100.0), 10.0);
    assert_eq!(ticks_per_second(333.0), 3.0);
}

#[test]
fn ticks_per_second_of_slow_server() {
    assert_eq!(ticks_per_second(1000.0), 1.0);
    assert_eq!(ticks_per_second(4000.0), 0.3);
}
