//! The concrete end-to-end scenarios from the interpreter's testable
//! properties: each one parses a small C program, calls `main`, and checks
//! stdout against the program's expected output.

mod common;

use common::run;

#[test]
fn scenario_1_arithmetic_precedence() {
    let out = run(r#"int main(){ printf("%d\n", 1+2*3); return 0; }"#);
    assert_eq!(out, "7\n");
}

#[test]
fn scenario_2_function_call_and_ternary() {
    let out = run(r#"int f(int a, int b){ return a<b?a:b; } int main(){ printf("%d\n", f(9,4)); return 0; }"#);
    assert_eq!(out, "4\n");
}

#[test]
fn scenario_3_array_and_for_loop() {
    let out = run(r#"int main(){ int a[] = {1,2,3,4}; int s=0; for(int i=0;i<4;i++) s+=a[i]; printf("%d\n", s); return 0; }"#);
    assert_eq!(out, "10\n");
}

#[test]
fn scenario_4_struct_member_access() {
    let out = run(r#"struct P{int x; int y;}; int main(){ struct P p={3,4}; printf("%d\n", p.x*p.x + p.y*p.y); return 0; }"#);
    assert_eq!(out, "25\n");
}

#[test]
fn scenario_5_string_indexing() {
    let out = run(r#"int main(){ char *s="hi"; printf("%c%c\n", s[0], s[1]); return 0; }"#);
    assert_eq!(out, "hi\n");
}

#[test]
fn scenario_6_function_like_macro() {
    let out = run("#define SQ(x) ((x)*(x))\nint main(){ printf(\"%d\\n\", SQ(3+1)); return 0; }");
    assert_eq!(out, "16\n");
}

#[test]
fn property_roundtrips_signed_integers() {
    for n in [0, 1, -1, i32::MAX, i32::MIN, 12345, -98765] {
        let out = run(&format!(r#"int main(){{ int x = {n}; printf("%d", x); return 0; }}"#));
        assert_eq!(out, n.to_string());
    }
}

#[test]
fn property_roundtrips_short_strings() {
    for s in ["", "hello", "the quick brown fox", "a b c", "1234567890"] {
        let out = run(&format!(r#"int main(){{ char *p = "{s}"; printf("%s", p); return 0; }}"#));
        assert_eq!(out, s);
    }
}

#[test]
fn for_loop_break_and_continue() {
    let out = run(
        r#"int main(){
            int i, s = 0;
            for (i = 0; i < 10; i++) {
                if (i == 5) break;
                if (i % 2 == 0) continue;
                s += i;
            }
            printf("%d\n", s);
            return 0;
        }"#,
    );
    assert_eq!(out, "4\n");
}

#[test]
fn return_propagates_out_of_nested_loops() {
    let out = run(
        r#"int find(int target){
            int i, j;
            for (i = 0; i < 5; i++) {
                for (j = 0; j < 5; j++) {
                    if (i * 5 + j == target) return i * 100 + j;
                }
            }
            return -1;
        }
        int main(){ printf("%d\n", find(17)); return 0; }"#,
    );
    assert_eq!(out, "302\n");
}

#[test]
fn switch_statement_falls_through_without_break() {
    let out = run(
        r#"int main(){
            int x = 2, total = 0;
            switch (x) {
                case 1: total += 1;
                case 2: total += 2;
                case 3: total += 3; break;
                case 4: total += 4;
            }
            printf("%d\n", total);
            return 0;
        }"#,
    );
    assert_eq!(out, "5\n");
}
